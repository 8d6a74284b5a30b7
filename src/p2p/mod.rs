//! Bybit P2P trading API.
//!
//! Every endpoint is described once in [`methods`] by its path, verb, and required parameter
//! names. [`Client`] turns a definition plus [`Params`] into a signed HTTP call:
//! - validate required parameters (no I/O on failure)
//! - encode the payload: sorted query string, JSON body, or multipart body
//! - sign it and attach the `X-BAPI-*` headers
//! - send it and normalize the response envelope
//!
//! # Example
//!
//! ```rust,no_run
//! use bybit_p2p_client_sdk::auth::Credentials;
//! use bybit_p2p_client_sdk::p2p::{Client, Config, Params};
//! use secrecy::SecretString;
//!
//! # async fn example() -> bybit_p2p_client_sdk::Result<()> {
//! let credentials = Credentials::hmac("api-key".to_owned(), SecretString::from("api-secret"));
//! let client = Client::new(Config::builder().credentials(credentials).build())?;
//!
//! let orders = client
//!     .get_pending_orders(Params::new().with("page", 1).with("size", 10))
//!     .await?;
//! println!("{}", orders.result);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
pub mod methods;
pub mod payload;
mod types;

pub use client::{Client, SignedRequest};
pub use config::{Config, RawConfig};
pub use methods::{HttpMethod, MethodDefinition, Operation};
pub use types::{
    ActionType, FileUpload, GetAdsListRequest, GetOrdersRequest, ItemType, Params,
    PostNewAdRequest, PriceType, Response, ServerTime, Side, TradingPreferenceSet,
    UpdateAdRequest,
};
