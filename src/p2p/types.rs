use std::io;
use std::path::PathBuf;

use bon::Builder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use crate::Result;
use crate::error::Error;

/// Open-ended request parameters, kept in insertion order.
///
/// `POST` bodies are serialized in this order, and the signature covers those exact bytes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts any request struct that serializes to a JSON object.
    pub fn from_request<T: Serialize>(request: &T) -> Result<Self> {
        match serde_json::to_value(request)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::validation(format!(
                "request parameters must serialize to an object, got {other}"
            ))),
        }
    }

    #[must_use]
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Server time as reported by the envelope: integer milliseconds (`time`) on v5
/// endpoints, a decimal seconds string (`time_now`) on legacy ones.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerTime {
    Millis(i64),
    Text(String),
}

/// Normalized response envelope.
///
/// Both the camelCase (`retCode`, `retMsg`, `retExtInfo`, `time`) and snake_case
/// (`ret_code`, `ret_msg`, `ext_info`, `time_now`) spellings decode into the same fields.
/// When a body carries both, the camelCase value wins.
#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawResponse")]
pub struct Response {
    #[serde(rename = "retCode")]
    pub ret_code: i64,
    #[serde(rename = "retMsg")]
    pub ret_msg: String,
    pub result: Value,
    #[serde(rename = "retExtInfo")]
    pub ret_ext_info: Option<Value>,
    pub ext_code: Option<String>,
    pub time: Option<ServerTime>,
}

/// Wire form of [`Response`], one slot per spelling.
#[derive(Deserialize)]
struct RawResponse {
    #[serde(rename = "retCode")]
    ret_code_camel: Option<i64>,
    ret_code: Option<i64>,
    #[serde(rename = "retMsg")]
    ret_msg_camel: Option<String>,
    ret_msg: Option<String>,
    #[serde(default)]
    result: Value,
    #[serde(rename = "retExtInfo")]
    ret_ext_info: Option<Value>,
    ext_info: Option<Value>,
    ext_code: Option<String>,
    time: Option<ServerTime>,
    time_now: Option<ServerTime>,
}

impl TryFrom<RawResponse> for Response {
    type Error = &'static str;

    fn try_from(raw: RawResponse) -> std::result::Result<Self, Self::Error> {
        let ret_code = raw
            .ret_code_camel
            .or(raw.ret_code)
            .ok_or("missing field `retCode`")?;
        // An empty camelCase message falls through to the snake_case one.
        let ret_msg = raw
            .ret_msg_camel
            .filter(|msg| !msg.is_empty())
            .or(raw.ret_msg)
            .unwrap_or_default();

        Ok(Self {
            ret_code,
            ret_msg,
            result: raw.result,
            ret_ext_info: raw.ret_ext_info.or(raw.ext_info),
            ext_code: raw.ext_code,
            time: raw.time.or(raw.time_now),
        })
    }
}

impl Response {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.ret_code == 0
    }

    /// Decodes `result` into a concrete type.
    pub fn result_as<T: DeserializeOwned>(&self) -> Result<T> {
        crate::from_value(self.result.clone())
    }

    pub fn into_result<T: DeserializeOwned>(self) -> Result<T> {
        crate::from_value(self.result)
    }
}

/// Source of a chat attachment.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileUpload {
    /// Read from disk when the request is built. The filename defaults to the base name.
    Path {
        path: PathBuf,
        filename: Option<String>,
    },
    /// Already in memory. A filename is mandatory.
    Bytes {
        data: Vec<u8>,
        filename: Option<String>,
    },
}

impl FileUpload {
    #[must_use]
    pub fn path<P: Into<PathBuf>>(path: P) -> Self {
        Self::Path {
            path: path.into(),
            filename: None,
        }
    }

    #[must_use]
    pub fn bytes<B: Into<Vec<u8>>>(data: B) -> Self {
        Self::Bytes {
            data: data.into(),
            filename: None,
        }
    }

    #[must_use]
    pub fn with_filename<S: Into<String>>(self, name: S) -> Self {
        match self {
            Self::Path { path, .. } => Self::Path {
                path,
                filename: Some(name.into()),
            },
            Self::Bytes { data, .. } => Self::Bytes {
                data,
                filename: Some(name.into()),
            },
        }
    }

    /// Reads `upload_file` (a path) and the optional `filename` from generic parameters.
    pub fn from_params(params: &Params) -> Result<Self> {
        let path = match params.get("upload_file") {
            Some(Value::String(path)) => path,
            Some(other) => {
                return Err(Error::validation(format!(
                    "upload_file must be a file path string, got {other}; \
                     pass in-memory data with FileUpload::bytes"
                )));
            }
            None => return Err(Error::validation("missing required parameter `upload_file`")),
        };

        let upload = Self::path(path.as_str());
        match params.get("filename") {
            Some(Value::String(name)) => Ok(upload.with_filename(name.as_str())),
            None | Some(Value::Null) => Ok(upload),
            Some(other) => Err(Error::validation(format!(
                "filename must be a string, got {other}"
            ))),
        }
    }

    /// Resolves the filename and file contents.
    ///
    /// The file handle is held only for the duration of the read.
    pub fn load(self) -> Result<(String, Vec<u8>)> {
        let (filename, data) = match self {
            Self::Bytes { data, filename } => {
                let filename = filename
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| {
                        Error::validation("filename is required when uploading raw bytes")
                    })?;
                (filename, data)
            }
            Self::Path { path, filename } => {
                let data = std::fs::read(&path).map_err(|e| match e.kind() {
                    io::ErrorKind::NotFound => Error::file_not_found(&path),
                    _ => Error::from(e),
                })?;
                let filename = match filename.filter(|name| !name.is_empty()) {
                    Some(name) => name,
                    None => path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .ok_or_else(|| {
                            Error::validation(format!(
                                "unable to derive a filename from {}",
                                path.display()
                            ))
                        })?,
                };
                (filename, data)
            }
        };

        if filename.contains(['"', '\r', '\n']) {
            return Err(Error::validation(format!(
                "filename {filename:?} contains characters not allowed in a multipart header"
            )));
        }

        Ok((filename, data))
    }
}

/// Ad side. Serialized as the string codes the API expects.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "0")]
    Buy,
    #[serde(rename = "1")]
    Sell,
}

/// Ad pricing mode. Serialized as the integer code.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceType {
    Fixed,
    Floating,
}

impl Serialize for PriceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(match self {
            PriceType::Fixed => 0,
            PriceType::Floating => 1,
        })
    }
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionType {
    Modify,
    Active,
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemType {
    Origin,
    Bulk,
}

/// Counterparty restrictions attached to an ad.
#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(on(String, into))]
pub struct TradingPreferenceSet {
    pub has_un_post_ad: Option<u32>,
    pub is_kyc: Option<u32>,
    pub is_email: Option<u32>,
    pub is_mobile: Option<u32>,
    pub has_register_time: Option<u32>,
    pub register_time_threshold: Option<u32>,
    pub order_finish_number_day30: Option<u32>,
    pub complete_rate_day30: Option<String>,
    pub national_limit: Option<String>,
    pub has_order_finish_number_day30: Option<u32>,
    pub has_complete_rate_day30: Option<u32>,
    pub has_national_limit: Option<u32>,
}

#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(on(String, into))]
pub struct GetAdsListRequest {
    pub item_id: Option<String>,
    /// `1` sold out, `2` available.
    pub status: Option<String>,
    pub side: Option<Side>,
    pub token_id: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub currency_id: Option<String>,
    #[serde(flatten)]
    #[builder(default)]
    pub extra: Params,
}

#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(on(String, into))]
pub struct UpdateAdRequest {
    pub id: String,
    pub price_type: Option<PriceType>,
    pub premium: Option<String>,
    pub price: Option<String>,
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
    pub remark: Option<String>,
    pub trading_preference_set: Option<TradingPreferenceSet>,
    pub payment_ids: Option<Vec<String>>,
    pub action_type: Option<ActionType>,
    pub quantity: Option<String>,
    pub payment_period: Option<String>,
    #[serde(flatten)]
    #[builder(default)]
    pub extra: Params,
}

#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(on(String, into))]
pub struct PostNewAdRequest {
    pub token_id: String,
    pub currency_id: String,
    pub side: Side,
    pub price_type: PriceType,
    pub premium: Option<String>,
    pub price: Option<String>,
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
    pub remark: Option<String>,
    pub trading_preference_set: Option<TradingPreferenceSet>,
    pub payment_ids: Option<Vec<String>>,
    pub quantity: Option<String>,
    pub payment_period: Option<String>,
    pub item_type: Option<ItemType>,
    #[serde(flatten)]
    #[builder(default)]
    pub extra: Params,
}

/// Filters shared by the order list and pending order list endpoints.
#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(on(String, into))]
pub struct GetOrdersRequest {
    pub status: Option<String>,
    pub begin_time: Option<String>,
    pub end_time: Option<String>,
    pub token_id: Option<String>,
    pub side: Option<Vec<u8>>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    #[serde(flatten)]
    #[builder(default)]
    pub extra: Params,
}
