use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::CarrierError;

/// Endpoint used by lookups that only carry an `op` tag.
pub const DEFAULT_ACTION: &str = "parcelshop_info";

/// Carrier API operations this client knows how to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    PickupPoints,
    CollectionTimes,
    ParcelImport,
    PickupOrdersSave,
    ParcelDatasend,
    ParcelPrint,
    ParcelManifestPrint,
}

/// How a response body has to be read for a given operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Structured,
    Raw,
    Sentinel,
}

impl Operation {
    /// Value of the `action` form field, if the operation is action-tagged.
    pub fn action(&self) -> Option<&'static str> {
        match self {
            Operation::PickupPoints | Operation::CollectionTimes => None,
            Operation::ParcelImport => Some("parcel_import"),
            Operation::PickupOrdersSave => Some("dpdis/pickupOrdersSave"),
            Operation::ParcelDatasend => Some("parcel_datasend"),
            Operation::ParcelPrint => Some("parcel_print"),
            Operation::ParcelManifestPrint => Some("parcel_manifest_print"),
        }
    }

    /// Value of the `op` form field for lookup operations.
    pub fn op(&self) -> Option<&'static str> {
        match self {
            Operation::PickupPoints => Some("pudo"),
            Operation::CollectionTimes => Some("date"),
            _ => None,
        }
    }

    /// Script name appended to the base URL, without the `.php` suffix.
    pub fn endpoint(&self) -> &'static str {
        self.action().unwrap_or(DEFAULT_ACTION)
    }

    pub fn response_kind(&self) -> ResponseKind {
        match self {
            Operation::ParcelPrint | Operation::ParcelManifestPrint => ResponseKind::Raw,
            Operation::PickupOrdersSave => ResponseKind::Sentinel,
            _ => ResponseKind::Structured,
        }
    }
}

/// Parameters of one outbound call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationRequest {
    #[serde(skip)]
    operation: Operation,
    #[serde(flatten)]
    params: BTreeMap<String, String>,
}

impl OperationRequest {
    /// Starts a request carrying only the operation's tag.
    pub fn new(operation: Operation) -> Self {
        let mut params = BTreeMap::new();
        if let Some(action) = operation.action() {
            params.insert("action".to_string(), action.to_string());
        }
        if let Some(op) = operation.op() {
            params.insert("op".to_string(), op.to_string());
        }
        Self { operation, params }
    }

    /// A request without the action/op tags, used for ledger notes.
    pub(crate) fn untagged(operation: Operation) -> Self {
        Self {
            operation,
            params: BTreeMap::new(),
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.params.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Copies caller-supplied fields in. Operation tags are never taken from the caller.
    pub fn merge_caller<I, K, V>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in fields {
            let key = key.into();
            if key == "action" || key == "op" {
                continue;
            }
            self.params.insert(key, value.into());
        }
    }
}

/// Interpreted carrier response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum ApiResponse {
    Structured(Map<String, Value>),
    Raw(#[serde(serialize_with = "lossy_bytes")] Vec<u8>),
    Sentinel(String),
    Failure { kind: FailureKind, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    Transport,
    Api,
    FatalPrintPrecondition,
}

pub const COURIER_CONFIRMATION: &str = "DONE";

impl ApiResponse {
    pub fn failure(err: &CarrierError) -> Self {
        let kind = match err {
            CarrierError::Configuration { .. } => FailureKind::Configuration,
            CarrierError::Transport(_) => FailureKind::Transport,
            CarrierError::Api { .. } => FailureKind::Api,
            CarrierError::FatalPrintPrecondition { .. } => FailureKind::FatalPrintPrecondition,
        };
        ApiResponse::Failure {
            kind,
            message: err.body().map(str::to_string).unwrap_or_else(|| err.to_string()),
        }
    }

    /// True only for the courier-call confirmation sentinel.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ApiResponse::Sentinel(s) if s == COURIER_CONFIRMATION)
    }

    pub fn as_structured(&self) -> Option<&Map<String, Value>> {
        match self {
            ApiResponse::Structured(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ApiResponse::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }
}

fn lossy_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

/// Sender identity used for returns and courier pickups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnAddress {
    pub name: String,
    pub street: String,
    pub postcode: String,
    pub country: String,
    pub city: String,
    pub phone: String,
}

/// Unix time range during which a courier is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PickupWindow {
    pub start: i64,
    pub end: i64,
}
