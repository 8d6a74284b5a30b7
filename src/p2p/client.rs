use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::{Client as ReqwestClient, Method, Request};
use url::Url;

use crate::auth::{self, Credentials};
use crate::p2p::config::Config;
use crate::p2p::methods::{self, HttpMethod, MethodDefinition, Operation};
use crate::p2p::payload::{self, BOUNDARY, JSON_CONTENT_TYPE};
use crate::p2p::types::{FileUpload, Params, Response};
use crate::{Result, Timestamp};

/// A request that has been encoded and signed but not yet sent.
///
/// Only valid for its own timestamp; every call builds a fresh one.
#[derive(Debug)]
pub struct SignedRequest {
    timestamp: Timestamp,
    payload: Vec<u8>,
    headers: HeaderMap,
    request: Request,
}

impl SignedRequest {
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Bytes covered by the signature after the `{timestamp}{api_key}{recv_window}` prefix.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.headers.get(&auth::SIGN)?.to_str().ok()
    }

    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }
}

/// Client for the Bybit P2P REST API.
///
/// Cheap to clone and safe to share: calls take `&self` and hold no per-call state, so any
/// number may be in flight at once.
#[derive(Clone, Debug)]
pub struct Client {
    host: Url,
    recv_window: u64,
    credentials: Credentials,
    client: ReqwestClient,
}

impl Client {
    /// Creates a client with its own HTTP connection pool.
    pub fn new(config: Config) -> Result<Self> {
        #[cfg(feature = "tracing")]
        if config.disable_ssl_checks {
            tracing::warn!("TLS certificate verification is disabled");
        }

        let client = ReqwestClient::builder()
            .danger_accept_invalid_certs(config.disable_ssl_checks)
            .build()?;

        Self::with_client(config, client)
    }

    /// Creates a client on top of a caller-provided HTTP client. The caller's TLS settings
    /// win over `disable_ssl_checks`.
    pub fn with_client(config: Config, client: ReqwestClient) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            host: config.base_url()?,
            recv_window: config.recv_window,
            credentials: config.credentials,
            client,
        })
    }

    #[must_use]
    pub fn host(&self) -> &Url {
        &self.host
    }

    #[must_use]
    pub fn recv_window(&self) -> u64 {
        self.recv_window
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Validates, signs, sends and interprets one call described by `definition`.
    ///
    /// Missing required parameters fail before anything is signed or sent. `FILE`
    /// definitions read `upload_file` as a path and an optional `filename`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            level = "debug",
            skip_all,
            fields(path = definition.path, method = %definition.method)
        )
    )]
    pub async fn execute(&self, definition: &MethodDefinition, params: Params) -> Result<Response> {
        definition.validate(&params)?;

        if definition.method == HttpMethod::File {
            let upload = FileUpload::from_params(&params)?;
            return self.upload(definition, upload).await;
        }

        let signed = self.sign_request(definition, &params, now())?;
        self.send(signed).await
    }

    /// Same as [`Client::execute`] for a registry operation.
    pub async fn call(&self, operation: Operation, params: Params) -> Result<Response> {
        self.execute(operation.definition(), params).await
    }

    /// Sends a multipart upload to `definition.path`.
    ///
    /// The file is resolved first: a buffer without a filename, or a path that does not
    /// exist, fails before a timestamp is taken.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(path = definition.path))
    )]
    pub async fn upload(&self, definition: &MethodDefinition, upload: FileUpload) -> Result<Response> {
        let (filename, data) = upload.load()?;
        let signed = self.sign_upload(definition, &filename, &data, now())?;
        self.send(signed).await
    }

    /// Encodes and signs a `GET` or `POST` call for `timestamp` without sending it.
    pub fn sign_request(
        &self,
        definition: &MethodDefinition,
        params: &Params,
        timestamp: Timestamp,
    ) -> Result<SignedRequest> {
        let mut url = self.endpoint(definition)?;

        let (method, payload, body) = match definition.method {
            HttpMethod::Get => {
                let query = payload::query_string(params);
                if !query.is_empty() {
                    url.set_query(Some(&query));
                }
                // Sign what the URL layer actually emits.
                let payload = url.query().unwrap_or_default().as_bytes().to_vec();
                (Method::GET, payload, None)
            }
            HttpMethod::Post => {
                let body = payload::json_body(params)?;
                (Method::POST, body.clone(), Some(body))
            }
            HttpMethod::File => {
                let upload = FileUpload::from_params(params)?;
                let (filename, data) = upload.load()?;
                return self.sign_upload(definition, &filename, &data, timestamp);
            }
        };

        let headers = auth::create_headers(
            &self.credentials,
            timestamp,
            self.recv_window,
            &payload,
            JSON_CONTENT_TYPE,
        )?;

        let mut builder = self.client.request(method, url);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        Ok(SignedRequest {
            timestamp,
            payload,
            headers,
            request: builder.build()?,
        })
    }

    /// Builds and signs the multipart body for an already-resolved file.
    pub fn sign_upload(
        &self,
        definition: &MethodDefinition,
        filename: &str,
        data: &[u8],
        timestamp: Timestamp,
    ) -> Result<SignedRequest> {
        let url = self.endpoint(definition)?;
        let body = payload::multipart_body(BOUNDARY, filename, data);

        let headers = auth::create_headers(
            &self.credentials,
            timestamp,
            self.recv_window,
            &body,
            &payload::multipart_content_type(BOUNDARY),
        )?;

        let request = self
            .client
            .request(Method::POST, url)
            .body(body.clone())
            .build()?;

        Ok(SignedRequest {
            timestamp,
            payload: body,
            headers,
            request,
        })
    }

    /// Resolves `definition.path` below the host, keeping any path prefix the host carries.
    fn endpoint(&self, definition: &MethodDefinition) -> Result<Url> {
        Ok(self.host.join(definition.path.trim_start_matches('/'))?)
    }

    async fn send(&self, signed: SignedRequest) -> Result<Response> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = %signed.request.method(),
            url = %signed.request.url(),
            timestamp = signed.timestamp,
            payload_len = signed.payload.len(),
            "sending signed request"
        );

        crate::request(&self.client, signed.request, Some(signed.headers)).await
    }

    /// Wallet balance per coin. Requires `accountType`.
    pub async fn get_current_balance(&self, params: Params) -> Result<Response> {
        self.execute(&methods::GET_CURRENT_BALANCE, params).await
    }

    /// Profile of the authenticated P2P user.
    pub async fn get_account_information(&self) -> Result<Response> {
        self.execute(&methods::GET_ACCOUNT_INFORMATION, Params::new())
            .await
    }

    /// Ads posted by this account. Filters are optional.
    pub async fn get_ads_list(&self, params: Params) -> Result<Response> {
        self.execute(&methods::GET_ADS_LIST, params).await
    }

    /// Details of one ad. Requires `itemId`.
    pub async fn get_ad_details(&self, params: Params) -> Result<Response> {
        self.execute(&methods::GET_AD_DETAILS, params).await
    }

    /// Modifies or re-activates an ad. See [`crate::p2p::UpdateAdRequest`].
    pub async fn update_ad(&self, params: Params) -> Result<Response> {
        self.execute(&methods::UPDATE_AD, params).await
    }

    /// Takes an ad offline. Requires `itemId`.
    pub async fn remove_ad(&self, params: Params) -> Result<Response> {
        self.execute(&methods::REMOVE_AD, params).await
    }

    /// Order history, paginated. Requires `page` and `size`.
    pub async fn get_orders(&self, params: Params) -> Result<Response> {
        self.execute(&methods::GET_ORDERS, params).await
    }

    /// Orders still in progress, paginated. Requires `page` and `size`.
    pub async fn get_pending_orders(&self, params: Params) -> Result<Response> {
        self.execute(&methods::GET_PENDING_ORDERS, params).await
    }

    /// Profile of the other party to an order. Requires `originalUid` and `orderId`.
    pub async fn get_counterparty_info(&self, params: Params) -> Result<Response> {
        self.execute(&methods::GET_COUNTERPARTY_INFO, params).await
    }

    /// Details of one order. Requires `orderId`.
    pub async fn get_order_details(&self, params: Params) -> Result<Response> {
        self.execute(&methods::GET_ORDER_DETAILS, params).await
    }

    /// Releases the escrowed asset to the buyer. Requires `orderId`.
    pub async fn release_assets(&self, params: Params) -> Result<Response> {
        self.execute(&methods::RELEASE_ASSETS, params).await
    }

    /// Marks an order as paid. Requires `orderId`, `paymentType` and `paymentId`.
    pub async fn mark_as_paid(&self, params: Params) -> Result<Response> {
        self.execute(&methods::MARK_AS_PAID, params).await
    }

    /// Chat history of an order. Requires `orderId` and `size`.
    pub async fn get_chat_messages(&self, params: Params) -> Result<Response> {
        self.execute(&methods::GET_CHAT_MESSAGES, params).await
    }

    /// Uploads a chat attachment. The part is always declared as `image/png`.
    pub async fn upload_chat_file(&self, upload: FileUpload) -> Result<Response> {
        self.upload(&methods::UPLOAD_CHAT_FILE, upload).await
    }

    /// Sends a chat message on an order. Requires `message`, `contentType` and `orderId`.
    pub async fn send_chat_message(&self, params: Params) -> Result<Response> {
        self.execute(&methods::SEND_CHAT_MESSAGE, params).await
    }

    /// Posts a new ad. See [`crate::p2p::PostNewAdRequest`].
    pub async fn post_new_ad(&self, params: Params) -> Result<Response> {
        self.execute(&methods::POST_NEW_AD, params).await
    }

    /// Public ads. Requires `tokenId`, `currencyId` and `side`.
    pub async fn get_online_ads(&self, params: Params) -> Result<Response> {
        self.execute(&methods::GET_ONLINE_ADS, params).await
    }

    /// Payment methods configured on this account.
    pub async fn get_user_payment_types(&self) -> Result<Response> {
        self.execute(&methods::GET_USER_PAYMENT_TYPES, Params::new())
            .await
    }
}

fn now() -> Timestamp {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use reqwest::header::CONTENT_TYPE;
    use secrecy::SecretString;

    use super::*;
    use crate::error::Kind;

    const TIMESTAMP_MS: Timestamp = 1_658_385_579_423;

    fn client(recv_window: u64) -> Client {
        let config = Config::builder()
            .credentials(Credentials::hmac(
                "XXXXXXXXXX".to_owned(),
                SecretString::from("YYYYYYYY"),
            ))
            .recv_window(recv_window)
            .build();
        Client::new(config).expect("client")
    }

    #[test]
    fn get_request_signs_the_query_string() {
        let client = client(20_000);
        let params = Params::new()
            .with("b", 2)
            .with("a", 1)
            .with("c", serde_json::Value::Null);
        let definition = MethodDefinition::new("/v5/test", HttpMethod::Get, &[]);

        let signed = client
            .sign_request(&definition, &params, TIMESTAMP_MS)
            .expect("signed");

        assert_eq!(signed.payload(), b"a=1&b=2");
        assert_eq!(signed.request().method(), Method::GET);
        assert_eq!(
            signed.request().url().as_str(),
            "https://api.bybit.com/v5/test?a=1&b=2"
        );
        assert!(signed.request().body().is_none(), "GET carries no body");
        assert_eq!(
            signed.signature(),
            Some("d1b86a8143e82f78de6716b4f00706f03d8a0b20da548c9bf50bbf8a77b2a92c")
        );
        assert_eq!(signed.headers()[&auth::TIMESTAMP], "1658385579423");
        assert_eq!(signed.headers()[&auth::RECV_WINDOW], "20000");
        assert_eq!(signed.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn get_request_without_params_has_no_query() {
        let client = client(20_000);
        let signed = client
            .sign_request(&methods::GET_CURRENT_BALANCE, &Params::new(), TIMESTAMP_MS)
            .expect("signed");

        assert_eq!(signed.payload(), b"");
        assert_eq!(signed.request().url().query(), None);
    }

    #[test]
    fn post_request_signs_the_body() {
        let client = client(20_000);
        let params = Params::new().with("orderId", "1");

        let signed = client
            .sign_request(&methods::GET_ORDER_DETAILS, &params, TIMESTAMP_MS)
            .expect("signed");

        let body = signed
            .request()
            .body()
            .and_then(reqwest::Body::as_bytes)
            .expect("buffered body");
        assert_eq!(body, br#"{"orderId":"1"}"#);
        assert_eq!(signed.payload(), body);
        assert_eq!(
            signed.signature(),
            Some(
                credentials_sign(&client, TIMESTAMP_MS, br#"{"orderId":"1"}"#).as_str()
            )
        );
    }

    #[test]
    fn upload_signature_covers_multipart_bytes() {
        let client = client(5000);

        let signed = client
            .sign_upload(&methods::UPLOAD_CHAT_FILE, "x.png", &[1, 2, 3], TIMESTAMP_MS)
            .expect("signed");

        assert_eq!(
            signed.payload(),
            payload::multipart_body("boundary-for-file", "x.png", &[1, 2, 3]).as_slice()
        );
        assert_eq!(
            signed.signature(),
            Some("fda14c0645248880a12132950ca8ee6a5cce135de8450f52095e5b9975016112")
        );
        assert_eq!(
            signed.headers()[CONTENT_TYPE],
            "multipart/form-data; boundary=boundary-for-file"
        );
        assert_eq!(signed.request().method(), Method::POST);
    }

    #[test]
    fn host_path_prefix_is_kept_for_every_method() {
        let config = Config::builder()
            .credentials(Credentials::hmac(
                "XXXXXXXXXX".to_owned(),
                SecretString::from("YYYYYYYY"),
            ))
            .host(Url::parse("http://proxy.local/bybit").expect("url"))
            .build();
        let client = Client::new(config).expect("client");

        let get = client
            .sign_request(&methods::GET_CURRENT_BALANCE, &Params::new(), TIMESTAMP_MS)
            .expect("signed");
        let upload = client
            .sign_upload(&methods::UPLOAD_CHAT_FILE, "x.png", &[1], TIMESTAMP_MS)
            .expect("signed");

        assert_eq!(
            get.request().url().as_str(),
            "http://proxy.local/bybit/v5/asset/transfer/query-account-coins-balance"
        );
        assert_eq!(upload.request().url().path(), "/bybit/v5/p2p/oss/upload_file");
    }

    #[tokio::test]
    async fn missing_required_param_fails_before_signing() {
        let client = client(20_000);

        let err = client
            .call(Operation::MarkAsPaid, Params::new().with("orderId", "1"))
            .await
            .expect_err("missing paymentType");

        assert_eq!(err.kind(), Kind::Validation);
    }

    fn credentials_sign(client: &Client, timestamp: Timestamp, payload: &[u8]) -> String {
        client
            .credentials()
            .sign(timestamp, client.recv_window(), payload)
            .expect("sign")
    }
}
