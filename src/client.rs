use anyhow::Result;
use chrono::Local;
use serde_json::Value;
use std::sync::Arc;

use crate::audit::{AuditEntry, AuditLog};
use crate::config::{self, CarrierConfig};
use crate::error::{CarrierError, CarrierResult};
use crate::models::{
    ApiResponse, COURIER_CONFIRMATION, Operation, OperationRequest, PickupWindow, ResponseKind,
};
use crate::pickup;
use crate::request;
use crate::transport::{self, FormPost, HttpResponse, HttpTransport, ReqwestTransport};

/// Client for the carrier's parcel API, bound to one carrier code and store.
pub struct CarrierApiClient {
    config: CarrierConfig,
    transport: Arc<dyn HttpTransport>,
    audit: Arc<AuditLog>,
}

impl CarrierApiClient {
    pub fn new(config: CarrierConfig) -> Result<Self> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: CarrierConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config,
            transport,
            audit: Arc::new(AuditLog::new()),
        }
    }

    /// Shares `audit` with other clients instead of keeping a private ledger.
    pub fn with_audit_log(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    pub fn config(&self) -> &CarrierConfig {
        &self.config
    }

    /// Pickup points (parcel terminals). Works without an account.
    pub async fn fetch_pickup_points(&self) -> CarrierResult<ApiResponse> {
        self.send(request::pickup_points(), None).await
    }

    pub async fn fetch_collection_times<I, K, V>(&self, fields: I) -> CarrierResult<ApiResponse>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.send(request::collection_times(&self.config, fields), None).await
    }

    pub async fn send_parcel<I, K, V>(&self, fields: I) -> CarrierResult<ApiResponse>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.send(request::parcel_import(fields), None).await
    }

    /// Orders a courier pickup. A confirmed order yields the `DONE` sentinel;
    /// anything else comes back as the unparsed body.
    pub async fn call_courier<I, K, V>(&self, fields: I) -> CarrierResult<ApiResponse>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.send(request::pickup_order(&self.config, fields), None).await
    }

    pub async fn send_manifest_data(&self) -> CarrierResult<ApiResponse> {
        self.send(request::data_send(), None).await
    }

    /// Labels for `parcels`, or today's manifest when `manifest` is set.
    ///
    /// The manifest is only printed once the carrier has confirmed the data
    /// send; otherwise this fails with [`CarrierError::FatalPrintPrecondition`].
    pub async fn fetch_label_or_manifest<S: AsRef<str>>(
        &self,
        parcels: &[S],
        manifest: bool,
    ) -> CarrierResult<ApiResponse> {
        if !manifest {
            return self.send(request::parcel_print(parcels), None).await;
        }

        // A data send only succeeds on a structured body with an empty errlog.
        if let Err(err) = self.send_manifest_data().await {
            let body = err
                .body()
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            tracing::error!(body = %body, "data send not confirmed, manifest print aborted");
            return Err(CarrierError::FatalPrintPrecondition { body });
        }

        let date = Local::now().format("%Y-%m-%d").to_string();
        self.send(request::manifest_print(&date), None).await
    }

    /// Pickup window if a courier has been called and the window has not started yet.
    pub fn is_courier_coming(&self) -> Option<PickupWindow> {
        self.courier_window_at(pickup::adjusted_now())
    }

    /// Same as [`Self::is_courier_coming`] against an explicit adjusted clock.
    pub fn courier_window_at(&self, now: i64) -> Option<PickupWindow> {
        pickup::courier_window_at(self.config.courier_pickup_time().as_deref(), now)
    }

    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.audit.entries()
    }

    pub fn audit_log_json(&self) -> serde_json::Result<String> {
        self.audit.to_json()
    }

    /// Sends `request` to `url` (or the configured API URL) and interprets the answer.
    ///
    /// Credentials are attached here for every operation. Each call leaves
    /// exactly one entry in the audit log, failures included.
    pub async fn send(
        &self,
        mut request: OperationRequest,
        url: Option<&str>,
    ) -> CarrierResult<ApiResponse> {
        let operation = request.operation();
        request::attach_credentials(&mut request, &self.config);

        let base = match url.map(str::to_string).or_else(|| self.config.api_url()) {
            Some(base) => base,
            None => {
                let err = CarrierError::Configuration {
                    field: config::API_URL.to_string(),
                };
                self.audit.record(AuditEntry::new("", request, Some(ApiResponse::failure(&err))));
                return Err(err);
            }
        };

        let url = transport::build_url(&base, operation);
        let post = FormPost {
            url: url.clone(),
            form: request
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            basic_auth: transport::demo_auth(&url),
            timeout: self.config.http_timeout(),
        };

        tracing::debug!(url = %url, endpoint = operation.endpoint(), "sending carrier request");

        let outcome = match self.transport.post_form(post).await {
            Ok(response) => interpret(operation, &url, response),
            Err(err) => Err(err.into()),
        };

        let logged = match &outcome {
            Ok(response) => response.clone(),
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "carrier request failed");
                ApiResponse::failure(err)
            }
        };
        self.audit.record(AuditEntry::new(url, request, Some(logged)));

        outcome
    }
}

/// Reads a carrier response according to the operation that produced it.
pub fn interpret(
    operation: Operation,
    url: &str,
    response: HttpResponse,
) -> CarrierResult<ApiResponse> {
    let api_error = |reason: String, body: &[u8]| CarrierError::Api {
        url: url.to_string(),
        status: response.status,
        reason,
        body: String::from_utf8_lossy(body).into_owned(),
    };

    if !response.is_success() {
        return Err(api_error(format!("HTTP status {}", response.status), &response.body));
    }

    match operation.response_kind() {
        ResponseKind::Raw => Ok(ApiResponse::Raw(response.body)),
        ResponseKind::Sentinel => {
            if response.body.get(3..7) == Some(COURIER_CONFIRMATION.as_bytes()) {
                Ok(ApiResponse::Sentinel(COURIER_CONFIRMATION.to_string()))
            } else {
                Ok(ApiResponse::Raw(response.body))
            }
        }
        ResponseKind::Structured => {
            let value: Value = serde_json::from_slice(&response.body)
                .map_err(|e| api_error(format!("undecodable body: {}", e), &response.body))?;

            let Value::Object(map) = value else {
                return Err(api_error("body is not an object".to_string(), &response.body));
            };

            let rejection = match map.get("errlog") {
                Some(Value::String(errlog)) if errlog.is_empty() => None,
                Some(_) => Some("errlog is set"),
                None => Some("errlog is missing"),
            };
            match rejection {
                None => Ok(ApiResponse::Structured(map)),
                Some(reason) => Err(api_error(reason.to_string(), &response.body)),
            }
        }
    }
}
