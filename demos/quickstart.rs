#![allow(clippy::print_stdout, reason = "Examples are okay to print to stdout")]

use std::env;

use bybit_p2p_client_sdk::p2p::{Client, Config, Params, RawConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let raw: RawConfig = serde_json::from_value(serde_json::json!({
        "api_key": env::var("BYBIT_API_KEY")?,
        "api_secret": env::var("BYBIT_API_SECRET")?,
        "testnet": env::var("BYBIT_TESTNET").is_ok_and(|v| v == "1"),
        "rsa": env::var("BYBIT_RSA").is_ok_and(|v| v == "1"),
    }))?;
    let client = Client::new(Config::from_raw(raw)?)?;
    info!(host = %client.host(), "client ready");

    let account = client.get_account_information().await?;
    println!("account: {}", serde_json::to_string_pretty(&account.result)?);

    let payments = client.get_user_payment_types().await?;
    println!("payment types: {}", payments.result);

    let pending = client
        .get_pending_orders(Params::new().with("page", 1).with("size", 10))
        .await?;
    println!("pending orders: {}", serde_json::to_string_pretty(&pending)?);

    Ok(())
}
