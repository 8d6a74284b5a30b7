use bon::Builder;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::Result;
use crate::auth::{Credentials, SignMode};
use crate::error::Error;
use crate::{DEFAULT_DOMAIN, DEFAULT_RECV_WINDOW, DEFAULT_TLD, MAINNET_SUBDOMAIN, TESTNET_SUBDOMAIN};

/// Raw client settings typically loaded from app-level config files.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize)]
pub struct RawConfig {
    pub api_key: String,
    pub api_secret: SecretString,
    #[serde(default)]
    pub testnet: bool,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub tld: Option<String>,
    #[serde(default)]
    pub recv_window: Option<u64>,
    /// Treat `api_secret` as a PEM-encoded RSA private key.
    #[serde(default)]
    pub rsa: bool,
    #[serde(default)]
    pub disable_ssl_checks: bool,
    /// Full base URL, overriding `testnet`, `domain` and `tld`.
    #[serde(default)]
    pub host: Option<String>,
}

/// Client configuration. Read-only once the client is built.
#[non_exhaustive]
#[derive(Clone, Debug, Builder)]
pub struct Config {
    pub credentials: Credentials,
    #[builder(default)]
    pub testnet: bool,
    #[builder(default = DEFAULT_DOMAIN.to_owned(), into)]
    pub domain: String,
    #[builder(default = DEFAULT_TLD.to_owned(), into)]
    pub tld: String,
    /// Milliseconds the server tolerates between our timestamp and its clock.
    #[builder(default = DEFAULT_RECV_WINDOW)]
    pub recv_window: u64,
    /// Accept invalid TLS certificates. Only for debugging proxies.
    #[builder(default)]
    pub disable_ssl_checks: bool,
    pub host: Option<Url>,
}

impl Config {
    pub fn from_raw(raw: RawConfig) -> Result<Self> {
        if raw.api_key.trim().is_empty() {
            return Err(Error::validation("api_key must not be empty"));
        }

        let mode = if raw.rsa { SignMode::Rsa } else { SignMode::Hmac };
        let credentials = Credentials::new(raw.api_key, raw.api_secret, mode)?;
        let host = raw.host.as_deref().map(Url::parse).transpose()?;

        let config = Self::builder()
            .credentials(credentials)
            .testnet(raw.testnet)
            .maybe_domain(raw.domain)
            .maybe_tld(raw.tld)
            .maybe_recv_window(raw.recv_window)
            .disable_ssl_checks(raw.disable_ssl_checks)
            .maybe_host(host)
            .build();

        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.recv_window == 0 {
            return Err(Error::validation("recv_window must be greater than zero"));
        }
        if self.host.is_none() && (self.domain.is_empty() || self.tld.is_empty()) {
            return Err(Error::validation(format!(
                "domain and tld must not be empty, got domain={:?} tld={:?}",
                self.domain, self.tld
            )));
        }
        Ok(())
    }

    /// Base URL requests are sent to: `host` (with a trailing slash) if set, else
    /// `https://{api|api-testnet}.{domain}.{tld}`.
    pub fn base_url(&self) -> Result<Url> {
        if let Some(host) = &self.host {
            let mut host = host.clone();
            if !host.path().ends_with('/') {
                let path = format!("{}/", host.path());
                host.set_path(&path);
            }
            return Ok(host);
        }

        let subdomain = if self.testnet {
            TESTNET_SUBDOMAIN
        } else {
            MAINNET_SUBDOMAIN
        };
        Ok(Url::parse(&format!(
            "https://{subdomain}.{}.{}",
            self.domain, self.tld
        ))?)
    }
}
