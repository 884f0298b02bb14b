use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

use crate::models::{ApiResponse, Operation, OperationRequest};

/// Number of requests recorded before the log freezes.
pub const AUDIT_CAPACITY: usize = 60;

pub const LIMIT_REACHED_MESSAGE: &str = "Logging limit reached";

/// Request fields never written out when the ledger is rendered.
pub const REDACTED_FIELDS: [&str; 1] = ["password"];
pub const REDACTED: &str = "********";

/// One attempted request: where it went, what was sent, what came back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub url: String,
    pub request: OperationRequest,
    pub response: Option<ApiResponse>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub limit_reached: bool,
}

impl AuditEntry {
    pub fn new(
        url: impl Into<String>,
        request: OperationRequest,
        response: Option<ApiResponse>,
    ) -> Self {
        Self {
            url: url.into(),
            request,
            response,
            limit_reached: false,
        }
    }

    fn limit_marker() -> Self {
        let mut request = OperationRequest::untagged(Operation::PickupPoints);
        request.insert("message", LIMIT_REACHED_MESSAGE);
        Self {
            url: String::new(),
            request,
            response: None,
            limit_reached: true,
        }
    }

    pub fn is_limit_marker(&self) -> bool {
        self.limit_reached
    }

    /// Copy safe to print: secret request fields are masked.
    pub fn redacted(&self) -> Self {
        let mut entry = self.clone();
        for field in REDACTED_FIELDS {
            if entry.request.contains(field) {
                entry.request.insert(field, REDACTED);
            }
        }
        entry
    }
}

/// Append-only ledger of carrier requests.
///
/// Holds at most `capacity` entries followed by a single limit marker;
/// once the marker is written every further append is dropped.
#[derive(Debug)]
pub struct AuditLog {
    capacity: usize,
    entries: Mutex<Vec<AuditEntry>>,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_capacity(AUDIT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Vec::with_capacity(capacity + 1)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns false when the entry was not stored.
    pub fn record(&self, entry: AuditEntry) -> bool {
        let mut entries = self.lock();
        if entries.len() > self.capacity {
            return false;
        }
        if entries.len() == self.capacity {
            tracing::info!(capacity = self.capacity, "audit log limit reached");
            entries.push(AuditEntry::limit_marker());
            return false;
        }
        entries.push(entry);
        true
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.lock().len() > self.capacity
    }

    /// Pretty JSON of the ledger with secrets masked.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let entries: Vec<AuditEntry> = self.lock().iter().map(AuditEntry::redacted).collect();
        serde_json::to_string_pretty(&entries)
    }

    // A poisoned lock still holds a consistent Vec; keep logging.
    fn lock(&self) -> MutexGuard<'_, Vec<AuditEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn entry(n: usize) -> AuditEntry {
        let mut request = OperationRequest::new(Operation::ParcelDatasend);
        request.insert("n", n.to_string());
        AuditEntry::new(format!("https://example.test/{}", n), request, None)
    }

    #[test]
    fn freezes_after_limit_marker() {
        let log = AuditLog::new();
        for n in 0..AUDIT_CAPACITY {
            assert!(log.record(entry(n)));
        }
        assert!(!log.is_frozen());

        assert!(!log.record(entry(60)));
        assert!(!log.record(entry(61)));
        assert!(!log.record(entry(62)));

        let entries = log.entries();
        assert_eq!(entries.len(), AUDIT_CAPACITY + 1);
        assert!(entries[AUDIT_CAPACITY].is_limit_marker());
        assert_eq!(entries[AUDIT_CAPACITY - 1].url, "https://example.test/59");
        assert_eq!(entries.iter().filter(|e| e.is_limit_marker()).count(), 1);
    }

    #[test]
    fn concurrent_appends_respect_capacity() {
        let log = Arc::new(AuditLog::with_capacity(10));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for n in 0..10 {
                        log.record(entry(t * 100 + n));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = log.entries();
        assert_eq!(entries.len(), 11);
        assert_eq!(entries.iter().filter(|e| e.is_limit_marker()).count(), 1);
        assert!(entries[10].is_limit_marker());
    }

    #[test]
    fn renders_as_json() {
        let log = AuditLog::new();
        log.record(entry(1));
        let json = log.to_json().unwrap();
        assert!(json.contains("\"url\": \"https://example.test/1\""));
        assert!(json.contains("\"action\": \"parcel_datasend\""));
    }

    #[test]
    fn rendered_json_masks_password() {
        let log = AuditLog::new();
        let mut request = OperationRequest::new(Operation::ParcelImport);
        request.insert("username", "merchant");
        request.insert("password", "hunter2");
        log.record(AuditEntry::new("https://example.test/parcel_import.php", request, None));

        let json = log.to_json().unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains(REDACTED));
        assert!(json.contains("\"username\": \"merchant\""));
        assert_eq!(log.entries()[0].request.get("password"), Some("hunter2"));
    }

    #[test]
    fn caller_message_is_not_a_limit_marker() {
        let log = AuditLog::new();
        let mut request = OperationRequest::new(Operation::ParcelImport);
        request.insert("message", LIMIT_REACHED_MESSAGE);
        log.record(AuditEntry::new("", request, None));

        assert!(!log.entries()[0].is_limit_marker());
        assert!(!log.is_frozen());
    }
}
