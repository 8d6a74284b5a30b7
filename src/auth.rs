//! Request authentication for the Bybit v5 REST API.
//!
//! Every private call carries five `X-BAPI-*` headers. The signature covers
//! `{timestamp}{api_key}{recv_window}` followed by the exact payload bytes sent on the wire:
//! the sorted query string for `GET`, the JSON body for `POST`, or the multipart body for
//! file uploads.
//!
//! Two signing modes exist:
//! - [`SignMode::Hmac`]: HMAC-SHA256 keyed by the API secret, lowercase hex.
//! - [`SignMode::Rsa`]: RSASSA-PKCS1-v1_5 over SHA-256 with the account's RSA private key,
//!   standard base64.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac as _};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey as _;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey as _;
use rsa::signature::{SignatureEncoding as _, Signer as _};
use secrecy::{ExposeSecret as _, SecretString};
use sha2::Sha256;

use crate::error::Error;
use crate::{Result, Timestamp};

pub const API_KEY: HeaderName = HeaderName::from_static("x-bapi-api-key");
pub const SIGN: HeaderName = HeaderName::from_static("x-bapi-sign");
pub const SIGN_TYPE: HeaderName = HeaderName::from_static("x-bapi-sign-type");
pub const TIMESTAMP: HeaderName = HeaderName::from_static("x-bapi-timestamp");
pub const RECV_WINDOW: HeaderName = HeaderName::from_static("x-bapi-recv-window");

/// Sent for both HMAC and RSA signatures.
pub const SIGN_TYPE_VALUE: &str = "2";

type HmacSha256 = Hmac<Sha256>;

/// Which algorithm [`Credentials`] sign with.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SignMode {
    #[default]
    Hmac,
    Rsa,
}

#[derive(Clone)]
enum SigningSecret {
    Hmac(SecretString),
    Rsa(Arc<SigningKey<Sha256>>),
}

/// API key plus the secret material used to sign requests.
///
/// RSA keys are parsed once here so a malformed key is rejected before any request is built.
#[derive(Clone)]
pub struct Credentials {
    key: String,
    secret: SigningSecret,
}

impl Credentials {
    #[must_use]
    pub fn hmac(key: String, secret: SecretString) -> Self {
        Self {
            key,
            secret: SigningSecret::Hmac(secret),
        }
    }

    /// Builds RSA credentials from a PEM private key, PKCS#8 or PKCS#1.
    pub fn rsa(key: String, private_key_pem: &SecretString) -> Result<Self> {
        let pem = private_key_pem.expose_secret().trim();
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_pkcs8| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| Error::validation(format!("invalid RSA private key: {e}")))?;

        Ok(Self {
            key,
            secret: SigningSecret::Rsa(Arc::new(SigningKey::<Sha256>::new(private_key))),
        })
    }

    pub fn new(key: String, secret: SecretString, mode: SignMode) -> Result<Self> {
        match mode {
            SignMode::Hmac => Ok(Self::hmac(key, secret)),
            SignMode::Rsa => Self::rsa(key, &secret),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn mode(&self) -> SignMode {
        match self.secret {
            SigningSecret::Hmac(_) => SignMode::Hmac,
            SigningSecret::Rsa(_) => SignMode::Rsa,
        }
    }

    /// Signs `payload` for the given timestamp and receive window.
    pub fn sign(&self, timestamp: Timestamp, recv_window: u64, payload: &[u8]) -> Result<String> {
        let message = signable(timestamp, &self.key, recv_window, payload);

        match &self.secret {
            SigningSecret::Hmac(secret) => {
                let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
                    .map_err(|e| Error::validation(format!("invalid HMAC secret: {e}")))?;
                mac.update(&message);
                Ok(hex::encode(mac.finalize().into_bytes()))
            }
            SigningSecret::Rsa(signing_key) => {
                let signature = signing_key
                    .try_sign(&message)
                    .map_err(|e| Error::validation(format!("unable to sign with RSA key: {e}")))?;
                Ok(STANDARD.encode(signature.to_bytes()))
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("mode", &self.mode())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Bytes covered by the signature: `{timestamp}{api_key}{recv_window}` then `payload`.
#[must_use]
pub fn signable(timestamp: Timestamp, api_key: &str, recv_window: u64, payload: &[u8]) -> Vec<u8> {
    let prefix = format!("{timestamp}{api_key}{recv_window}");
    let mut message = Vec::with_capacity(prefix.len() + payload.len());
    message.extend_from_slice(prefix.as_bytes());
    message.extend_from_slice(payload);
    message
}

/// Signs `payload` and returns the full authentication header set for one call.
pub fn create_headers(
    credentials: &Credentials,
    timestamp: Timestamp,
    recv_window: u64,
    payload: &[u8],
    content_type: &str,
) -> Result<HeaderMap> {
    let signature = credentials.sign(timestamp, recv_window, payload)?;

    let mut map = HeaderMap::new();
    map.insert(API_KEY, HeaderValue::from_str(credentials.key())?);
    map.insert(SIGN, HeaderValue::from_str(&signature)?);
    map.insert(SIGN_TYPE, HeaderValue::from_static(SIGN_TYPE_VALUE));
    map.insert(TIMESTAMP, HeaderValue::from_str(&timestamp.to_string())?);
    map.insert(RECV_WINDOW, HeaderValue::from_str(&recv_window.to_string())?);
    map.insert(CONTENT_TYPE, HeaderValue::from_str(content_type)?);

    Ok(map)
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::pkcs8::DecodePrivateKey as _;
    use rsa::signature::Verifier as _;

    use super::*;

    const PKCS8_PEM: &str = include_str!("../tests/fixtures/rsa_pkcs8.pem");
    const PKCS1_PEM: &str = include_str!("../tests/fixtures/rsa_pkcs1.pem");

    const TIMESTAMP_MS: Timestamp = 1_658_385_579_423;
    const KEY: &str = "XXXXXXXXXX";
    const RECV: u64 = 5000;
    const PAYLOAD: &[u8] = b"category=option&symbol=BTC-29JUL22-25000-C";

    fn hmac_credentials() -> Credentials {
        Credentials::hmac(KEY.to_owned(), SecretString::from("YYYYYYYY"))
    }

    fn rsa_credentials() -> Credentials {
        Credentials::rsa(KEY.to_owned(), &SecretString::from(PKCS8_PEM)).expect("valid pkcs8 key")
    }

    #[test]
    fn signable_concatenates_prefix_and_payload() {
        let message = signable(TIMESTAMP_MS, KEY, RECV, b"a=1");
        assert_eq!(message, b"1658385579423XXXXXXXXXX5000a=1".to_vec());
    }

    #[test]
    fn hmac_signature_matches_known_answer() {
        let signature = hmac_credentials()
            .sign(TIMESTAMP_MS, RECV, PAYLOAD)
            .expect("hmac signing");

        assert_eq!(
            signature,
            "ef908fba8124db6a79c54c6e51bff69e1d15290638beee8f8f3d8faf70e4e600"
        );
    }

    #[test]
    fn hmac_signature_is_deterministic() {
        let credentials = hmac_credentials();
        let first = credentials.sign(TIMESTAMP_MS, RECV, PAYLOAD).expect("sign");
        let second = credentials.sign(TIMESTAMP_MS, RECV, PAYLOAD).expect("sign");

        assert_eq!(first, second, "same inputs must sign identically");
        assert_eq!(first.len(), 64, "sha256 hex digest is 64 chars");
        assert!(
            first.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')),
            "digest must be lowercase hex: {first}"
        );
    }

    #[test]
    fn hmac_signature_changes_with_timestamp() {
        let credentials = hmac_credentials();
        let first = credentials.sign(TIMESTAMP_MS, RECV, PAYLOAD).expect("sign");
        let second = credentials
            .sign(TIMESTAMP_MS + 1, RECV, PAYLOAD)
            .expect("sign");

        assert_ne!(first, second, "signature is bound to its timestamp");
    }

    #[test]
    fn rsa_signature_matches_known_answer() {
        let signature = rsa_credentials()
            .sign(TIMESTAMP_MS, RECV, PAYLOAD)
            .expect("rsa signing");

        assert_eq!(
            signature,
            "fDsRPXDsKRnM1MO94m0Kt62l0UR4roNdKA/jNbioWl3CCw3pLtkh01cFtm4GFhrG2mrMtQ6In094jqjJN4taFufxyEYkLAXq5Xniezcp+b6GFArGKbdOBqo/pvuPWphuWWMYnLnj99w2nhnpnNCHE62cH9YbHEa9LINikxlmPX+UUW6grdeQnY4uCS7akM9jWJe81tFLC17gGMbRive8bqmRnaHvv+xQfAZVchCVtXlExBQdn/AS7L6rIAuKuJeSMXeoqN6oOnSOlfW/y13b1DavtPk2j3lbBjJNnVPaBVsd79XTCh+qoJm9jl/c5FRNP6Shw2jw0v9WdrbqytNJhA=="
        );
    }

    #[test]
    fn rsa_signature_verifies_with_public_key() {
        let signature = rsa_credentials()
            .sign(TIMESTAMP_MS, RECV, PAYLOAD)
            .expect("rsa signing");

        let private_key = RsaPrivateKey::from_pkcs8_pem(PKCS8_PEM).expect("valid key");
        let verifying_key = VerifyingKey::<Sha256>::new(private_key.to_public_key());
        let raw = STANDARD.decode(&signature).expect("base64 signature");
        let signature = Signature::try_from(raw.as_slice()).expect("signature bytes");

        verifying_key
            .verify(&signable(TIMESTAMP_MS, KEY, RECV, PAYLOAD), &signature)
            .expect("signature should verify");
    }

    #[test]
    fn rsa_and_hmac_encodings_differ() {
        let hmac = hmac_credentials().sign(TIMESTAMP_MS, RECV, PAYLOAD).expect("sign");
        let rsa = rsa_credentials().sign(TIMESTAMP_MS, RECV, PAYLOAD).expect("sign");

        assert_ne!(hmac, rsa, "modes must produce different signatures");
        assert!(hex::decode(&hmac).is_ok(), "hmac signature is hex");
        assert!(STANDARD.decode(&rsa).is_ok(), "rsa signature is base64");
        assert!(hex::decode(&rsa).is_err(), "rsa signature is not hex");
    }

    #[test]
    fn pkcs1_and_pkcs8_keys_sign_identically() {
        let pkcs1 = Credentials::rsa(KEY.to_owned(), &SecretString::from(PKCS1_PEM))
            .expect("valid pkcs1 key");

        assert_eq!(
            pkcs1.sign(TIMESTAMP_MS, RECV, PAYLOAD).expect("sign"),
            rsa_credentials().sign(TIMESTAMP_MS, RECV, PAYLOAD).expect("sign"),
        );
    }

    #[test]
    fn malformed_rsa_key_is_rejected() {
        let err = Credentials::new(
            KEY.to_owned(),
            SecretString::from("not a pem"),
            SignMode::Rsa,
        )
        .expect_err("garbage key must fail");

        assert_eq!(err.kind(), crate::error::Kind::Validation);
    }

    #[test]
    fn sign_type_header_is_fixed_in_both_modes() {
        for credentials in [hmac_credentials(), rsa_credentials()] {
            let headers =
                create_headers(&credentials, TIMESTAMP_MS, RECV, PAYLOAD, "application/json")
                    .expect("headers");

            assert_eq!(headers[&SIGN_TYPE], "2", "mode {}", credentials.mode());
            assert_eq!(headers[&API_KEY], KEY);
            assert_eq!(headers[&TIMESTAMP], "1658385579423");
            assert_eq!(headers[&RECV_WINDOW], "5000");
            assert_eq!(headers[&CONTENT_TYPE], "application/json");
            assert_eq!(
                headers[&SIGN],
                credentials.sign(TIMESTAMP_MS, RECV, PAYLOAD).expect("sign").as_str()
            );
        }
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", hmac_credentials());

        assert!(!rendered.contains("YYYYYYYY"), "secret leaked: {rendered}");
        assert!(rendered.contains("REDACTED"), "marker missing: {rendered}");
    }
}
