use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use crate::models::ReturnAddress;

pub const API_URL: &str = "API_URL";
pub const SENDPACKAGE_USERNAME: &str = "SENDPACKAGE_USERNAME";
pub const SENDPACKAGE_PASSWORD: &str = "SENDPACKAGE_PASSWORD";
pub const RETURN_NAME: &str = "RETURN_NAME";
pub const RETURN_STREET: &str = "RETURN_STREET";
pub const RETURN_POSTCODE: &str = "RETURN_POSTCODE";
pub const RETURN_COUNTRY: &str = "RETURN_COUNTRY";
pub const RETURN_CITYCOUNTY: &str = "RETURN_CITYCOUNTY";
pub const RETURN_PHONE: &str = "RETURN_PHONE";
pub const HTTP_REQUEST_TIMEOUT: &str = "HTTP_REQUEST_TIMEOUT";
pub const COURIER_PICKUP_TIME: &str = "COURIER_PICKUP_TIME";

/// Lower bound for the HTTP timeout, in seconds.
pub const MIN_TIMEOUT_SECS: u64 = 10;

/// Tenant-scoped key/value store owned by the host platform.
pub trait ConfigSource: Send + Sync {
    fn get(&self, path: &str, store: Option<&str>) -> Option<String>;
}

/// In-memory source. Store-scoped values shadow global ones.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfig {
    global: HashMap<String, String>,
    scoped: HashMap<(String, String), String>,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.global.insert(path.into(), value.into());
        self
    }

    pub fn set_for_store(
        &mut self,
        store: impl Into<String>,
        path: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.scoped.insert((store.into(), path.into()), value.into());
        self
    }
}

impl ConfigSource for MemoryConfig {
    fn get(&self, path: &str, store: Option<&str>) -> Option<String> {
        store
            .and_then(|store| self.scoped.get(&(store.to_string(), path.to_string())))
            .or_else(|| self.global.get(path))
            .cloned()
    }
}

/// Reads configuration from the process environment.
///
/// A store-scoped lookup tries `<path>_<STORE>` before `<path>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigSource for EnvConfig {
    fn get(&self, path: &str, store: Option<&str>) -> Option<String> {
        store
            .and_then(|store| env::var(format!("{}_{}", path, store.to_uppercase())).ok())
            .or_else(|| env::var(path).ok())
    }
}

/// Read-only view over one carrier's configuration for one store.
#[derive(Clone)]
pub struct CarrierConfig {
    source: Arc<dyn ConfigSource>,
    code: Option<String>,
    store: Option<String>,
}

impl CarrierConfig {
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self {
            source,
            code: None,
            store: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn store(&self) -> Option<&str> {
        self.store.as_deref()
    }

    /// Looks up `<code><field>`. Returns `None` without a carrier code, and for empty values.
    pub fn get(&self, field: &str) -> Option<String> {
        let code = self.code.as_deref().filter(|c| !c.is_empty())?;
        let path = format!("{}{}", code, field);
        self.source
            .get(&path, self.store.as_deref())
            .filter(|value| !value.is_empty())
    }

    pub fn api_url(&self) -> Option<String> {
        self.get(API_URL)
    }

    pub fn username(&self) -> Option<String> {
        self.get(SENDPACKAGE_USERNAME)
    }

    pub fn password(&self) -> Option<String> {
        self.get(SENDPACKAGE_PASSWORD)
    }

    pub fn courier_pickup_time(&self) -> Option<String> {
        self.get(COURIER_PICKUP_TIME)
    }

    /// Configured timeout in (possibly fractional) seconds, never below [`MIN_TIMEOUT_SECS`].
    pub fn http_timeout(&self) -> Duration {
        let secs = self
            .get(HTTP_REQUEST_TIMEOUT)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs > MIN_TIMEOUT_SECS as f64)
            .unwrap_or(MIN_TIMEOUT_SECS as f64);
        Duration::from_secs_f64(secs)
    }

    /// Return address with missing fields left empty.
    pub fn return_address(&self) -> ReturnAddress {
        let field = |name: &str| self.get(name).unwrap_or_default();
        ReturnAddress {
            name: field(RETURN_NAME),
            street: field(RETURN_STREET),
            postcode: field(RETURN_POSTCODE),
            country: field(RETURN_COUNTRY),
            city: field(RETURN_CITYCOUNTY),
            phone: field(RETURN_PHONE),
        }
    }
}

impl std::fmt::Debug for CarrierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarrierConfig")
            .field("code", &self.code)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Settings for the diagnostic binary, loaded from environment variables
#[derive(Debug, Clone)]
pub struct Settings {
    pub carrier_code: String,
    pub store_id: Option<String>,
}

impl Settings {
    /// Load settings from environment variables
    ///
    /// # Environment Variables
    /// - `CARRIER_CODE`: Required - Prefix of the carrier's configuration keys
    /// - `STORE_ID`: Optional - Store whose configuration should be used
    pub fn from_env() -> Result<Self> {
        let carrier_code = env::var("CARRIER_CODE")
            .context("CARRIER_CODE not set")?;

        if carrier_code.trim().is_empty() {
            bail!("CARRIER_CODE cannot be empty");
        }

        let store_id = env::var("STORE_ID")
            .ok()
            .filter(|store| !store.trim().is_empty());

        Ok(Settings {
            carrier_code,
            store_id,
        })
    }

    pub fn carrier_config(&self) -> CarrierConfig {
        let config = CarrierConfig::new(Arc::new(EnvConfig)).with_code(self.carrier_code.clone());
        match &self.store_id {
            Some(store) => config.with_store(store.clone()),
            None => config,
        }
    }
}
