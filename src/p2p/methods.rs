//! Wire contract of every supported P2P endpoint.
//!
//! The table is fixed at compile time. [`crate::p2p::Client::execute`] checks
//! [`MethodDefinition::required`] against the caller's parameters before a timestamp is taken
//! or anything is signed.

use crate::Result;
use crate::error::Error;
use crate::p2p::types::Params;

/// How a request is encoded and sent.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Parameters go in a sorted query string.
    Get,
    /// Parameters go in a JSON body.
    Post,
    /// A single multipart file part, sent as `POST`.
    File,
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MethodDefinition {
    pub path: &'static str,
    pub method: HttpMethod,
    pub required: &'static [&'static str],
}

impl MethodDefinition {
    /// Describes an endpoint that is not (yet) in [`Operation`].
    #[must_use]
    pub const fn new(
        path: &'static str,
        method: HttpMethod,
        required: &'static [&'static str],
    ) -> Self {
        Self {
            path,
            method,
            required,
        }
    }

    /// First required parameter absent from `params`, in declaration order.
    #[must_use]
    pub fn missing(&self, params: &Params) -> Option<&'static str> {
        self.required
            .iter()
            .copied()
            .find(|name| !params.contains_key(name))
    }

    pub fn validate(&self, params: &Params) -> Result<()> {
        match self.missing(params) {
            Some(name) => Err(Error::missing_parameter(self.path, name)),
            None => Ok(()),
        }
    }
}

/// Every operation the façade exposes.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    GetCurrentBalance,
    GetAccountInformation,
    GetAdsList,
    GetAdDetails,
    UpdateAd,
    RemoveAd,
    GetOrders,
    GetPendingOrders,
    GetCounterpartyInfo,
    GetOrderDetails,
    ReleaseAssets,
    MarkAsPaid,
    GetChatMessages,
    UploadChatFile,
    SendChatMessage,
    PostNewAd,
    GetOnlineAds,
    GetUserPaymentTypes,
}

impl Operation {
    pub const ALL: [Operation; 18] = [
        Operation::GetCurrentBalance,
        Operation::GetAccountInformation,
        Operation::GetAdsList,
        Operation::GetAdDetails,
        Operation::UpdateAd,
        Operation::RemoveAd,
        Operation::GetOrders,
        Operation::GetPendingOrders,
        Operation::GetCounterpartyInfo,
        Operation::GetOrderDetails,
        Operation::ReleaseAssets,
        Operation::MarkAsPaid,
        Operation::GetChatMessages,
        Operation::UploadChatFile,
        Operation::SendChatMessage,
        Operation::PostNewAd,
        Operation::GetOnlineAds,
        Operation::GetUserPaymentTypes,
    ];

    #[must_use]
    pub const fn definition(self) -> &'static MethodDefinition {
        match self {
            Operation::GetCurrentBalance => &GET_CURRENT_BALANCE,
            Operation::GetAccountInformation => &GET_ACCOUNT_INFORMATION,
            Operation::GetAdsList => &GET_ADS_LIST,
            Operation::GetAdDetails => &GET_AD_DETAILS,
            Operation::UpdateAd => &UPDATE_AD,
            Operation::RemoveAd => &REMOVE_AD,
            Operation::GetOrders => &GET_ORDERS,
            Operation::GetPendingOrders => &GET_PENDING_ORDERS,
            Operation::GetCounterpartyInfo => &GET_COUNTERPARTY_INFO,
            Operation::GetOrderDetails => &GET_ORDER_DETAILS,
            Operation::ReleaseAssets => &RELEASE_ASSETS,
            Operation::MarkAsPaid => &MARK_AS_PAID,
            Operation::GetChatMessages => &GET_CHAT_MESSAGES,
            Operation::UploadChatFile => &UPLOAD_CHAT_FILE,
            Operation::SendChatMessage => &SEND_CHAT_MESSAGE,
            Operation::PostNewAd => &POST_NEW_AD,
            Operation::GetOnlineAds => &GET_ONLINE_ADS,
            Operation::GetUserPaymentTypes => &GET_USER_PAYMENT_TYPES,
        }
    }
}

pub static GET_CURRENT_BALANCE: MethodDefinition = MethodDefinition::new(
    "/v5/asset/transfer/query-account-coins-balance",
    HttpMethod::Get,
    &["accountType"],
);

pub static GET_ACCOUNT_INFORMATION: MethodDefinition =
    MethodDefinition::new("/v5/p2p/user/personal/info", HttpMethod::Post, &[]);

pub static GET_ADS_LIST: MethodDefinition =
    MethodDefinition::new("/v5/p2p/item/personal/list", HttpMethod::Post, &[]);

pub static GET_AD_DETAILS: MethodDefinition =
    MethodDefinition::new("/v5/p2p/item/info", HttpMethod::Post, &["itemId"]);

pub static UPDATE_AD: MethodDefinition = MethodDefinition::new(
    "/v5/p2p/item/update",
    HttpMethod::Post,
    &[
        "id",
        "priceType",
        "premium",
        "price",
        "minAmount",
        "maxAmount",
        "remark",
        "tradingPreferenceSet",
        "paymentIds",
        "actionType",
        "quantity",
        "paymentPeriod",
    ],
);

pub static REMOVE_AD: MethodDefinition =
    MethodDefinition::new("/v5/p2p/item/cancel", HttpMethod::Post, &["itemId"]);

pub static GET_ORDERS: MethodDefinition = MethodDefinition::new(
    "/v5/p2p/order/simplifyList",
    HttpMethod::Post,
    &["page", "size"],
);

pub static GET_PENDING_ORDERS: MethodDefinition = MethodDefinition::new(
    "/v5/p2p/order/pending/simplifyList",
    HttpMethod::Post,
    &["page", "size"],
);

pub static GET_COUNTERPARTY_INFO: MethodDefinition = MethodDefinition::new(
    "/v5/p2p/user/order/personal/info",
    HttpMethod::Post,
    &["originalUid", "orderId"],
);

pub static GET_ORDER_DETAILS: MethodDefinition =
    MethodDefinition::new("/v5/p2p/order/info", HttpMethod::Post, &["orderId"]);

pub static RELEASE_ASSETS: MethodDefinition =
    MethodDefinition::new("/v5/p2p/order/finish", HttpMethod::Post, &["orderId"]);

pub static MARK_AS_PAID: MethodDefinition = MethodDefinition::new(
    "/v5/p2p/order/pay",
    HttpMethod::Post,
    &["orderId", "paymentType", "paymentId"],
);

pub static GET_CHAT_MESSAGES: MethodDefinition = MethodDefinition::new(
    "/v5/p2p/order/message/listpage",
    HttpMethod::Post,
    &["orderId", "size"],
);

pub static UPLOAD_CHAT_FILE: MethodDefinition =
    MethodDefinition::new("/v5/p2p/oss/upload_file", HttpMethod::File, &["upload_file"]);

pub static SEND_CHAT_MESSAGE: MethodDefinition = MethodDefinition::new(
    "/v5/p2p/order/message/send",
    HttpMethod::Post,
    &["message", "contentType", "orderId"],
);

pub static POST_NEW_AD: MethodDefinition = MethodDefinition::new(
    "/v5/p2p/item/create",
    HttpMethod::Post,
    &[
        "tokenId",
        "currencyId",
        "side",
        "priceType",
        "premium",
        "price",
        "minAmount",
        "maxAmount",
        "remark",
        "tradingPreferenceSet",
        "paymentIds",
        "quantity",
        "paymentPeriod",
        "itemType",
    ],
);

pub static GET_ONLINE_ADS: MethodDefinition = MethodDefinition::new(
    "/v5/p2p/item/online",
    HttpMethod::Post,
    &["tokenId", "currencyId", "side"],
);

pub static GET_USER_PAYMENT_TYPES: MethodDefinition =
    MethodDefinition::new("/v5/p2p/user/payment/list", HttpMethod::Post, &[]);
