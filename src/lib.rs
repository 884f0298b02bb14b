pub mod audit;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod pickup;
pub mod request;
pub mod transport;

pub use audit::{AuditEntry, AuditLog};
pub use client::CarrierApiClient;
pub use config::{CarrierConfig, ConfigSource, EnvConfig, MemoryConfig};
pub use error::{CarrierError, CarrierResult, TransportError};
pub use models::{ApiResponse, Operation, OperationRequest, PickupWindow};
