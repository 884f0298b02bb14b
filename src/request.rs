//! Per-operation request construction.
//!
//! Every builder merges caller fields first and then applies the
//! carrier-mandated overrides, so configured identity always wins.

use crate::config::CarrierConfig;
use crate::models::{Operation, OperationRequest};

pub const DEFAULT_COLLECTION_TYPE: &str = "po";
pub const DEFAULT_PARCEL_TYPE: &str = "LO";

/// Overwrites `request` with carrier-derived values.
pub fn apply_overrides<'a, I>(request: &mut OperationRequest, overrides: I)
where
    I: IntoIterator<Item = (&'a str, String)>,
{
    for (key, value) in overrides {
        request.insert(key, value);
    }
}

/// Replaces any caller credentials with the configured ones.
/// Unconfigured credentials are left out entirely.
pub fn attach_credentials(request: &mut OperationRequest, config: &CarrierConfig) {
    request.remove("username");
    request.remove("password");
    if let Some(username) = config.username() {
        request.insert("username", username);
    }
    if let Some(password) = config.password() {
        request.insert("password", password);
    }
}

/// Country code as the collection-time lookup expects it.
///
/// Estonia must be sent as `eesti`; every other code is only lower-cased.
pub fn collection_country(country: &str) -> String {
    let country = country.to_lowercase();
    if country == "ee" {
        "eesti".to_string()
    } else {
        country
    }
}

pub fn pickup_points() -> OperationRequest {
    OperationRequest::new(Operation::PickupPoints)
}

pub fn collection_times<I, K, V>(config: &CarrierConfig, fields: I) -> OperationRequest
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut request = OperationRequest::new(Operation::CollectionTimes);
    request.merge_caller(fields);

    let po_type = request
        .get("Po_type")
        .map(str::to_lowercase)
        .unwrap_or_else(|| DEFAULT_COLLECTION_TYPE.to_string());
    let address = config.return_address();

    apply_overrides(
        &mut request,
        [
            ("Po_postal", address.postcode),
            ("Po_country", collection_country(&address.country)),
            ("Po_type", po_type),
        ],
    );
    request
}

pub fn parcel_import<I, K, V>(fields: I) -> OperationRequest
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut request = OperationRequest::new(Operation::ParcelImport);
    request.merge_caller(fields);
    if !request.contains("Po_type") {
        request.insert("Po_type", DEFAULT_PARCEL_TYPE);
    }
    request
}

pub fn pickup_order<I, K, V>(config: &CarrierConfig, fields: I) -> OperationRequest
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut request = OperationRequest::new(Operation::PickupOrdersSave);
    request.merge_caller(fields);

    let address = config.return_address();
    apply_overrides(
        &mut request,
        [
            ("payerName", address.name.clone()),
            ("senderName", address.name.clone()),
            ("senderAddress", address.street),
            ("senderPostalCode", address.postcode),
            ("senderCountry", address.country.to_lowercase()),
            ("senderCity", address.city),
            ("senderContact", address.name),
            ("senderPhone", address.phone),
        ],
    );
    request
}

pub fn data_send() -> OperationRequest {
    OperationRequest::new(Operation::ParcelDatasend)
}

pub fn parcel_print<S: AsRef<str>>(parcels: &[S]) -> OperationRequest {
    let mut request = OperationRequest::new(Operation::ParcelPrint);
    let joined = parcels
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("|");
    request.insert("parcels", joined);
    request
}

/// `date` is the manifest day, `YYYY-MM-DD`.
pub fn manifest_print(date: &str) -> OperationRequest {
    let mut request = OperationRequest::new(Operation::ParcelManifestPrint);
    request.insert("date", date);
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;
    use std::sync::Arc;

    fn config(country: &str) -> CarrierConfig {
        let mut source = MemoryConfig::new();
        source
            .set("DPD_RETURN_NAME", "Warehouse OU")
            .set("DPD_RETURN_STREET", "Pikk 1")
            .set("DPD_RETURN_POSTCODE", "10123")
            .set("DPD_RETURN_COUNTRY", country)
            .set("DPD_RETURN_CITYCOUNTY", "Tallinn")
            .set("DPD_RETURN_PHONE", "+3725550000")
            .set("DPD_SENDPACKAGE_USERNAME", "merchant")
            .set("DPD_SENDPACKAGE_PASSWORD", "secret");
        CarrierConfig::new(Arc::new(source)).with_code("DPD_")
    }

    const NO_FIELDS: [(&str, &str); 0] = [];

    #[test]
    fn estonia_is_sent_as_eesti() {
        for country in ["EE", "ee"] {
            let request = collection_times(&config(country), NO_FIELDS);
            assert_eq!(request.get("Po_country"), Some("eesti"));
        }
    }

    #[test]
    fn other_countries_are_lower_cased() {
        let request = collection_times(&config("LV"), NO_FIELDS);
        assert_eq!(request.get("Po_country"), Some("lv"));
        assert_eq!(collection_country("Lt"), "lt");
    }

    #[test]
    fn collection_times_defaults_and_case_folds_type() {
        let request = collection_times(&config("EE"), NO_FIELDS);
        assert_eq!(request.get("op"), Some("date"));
        assert_eq!(request.get("Po_type"), Some("po"));
        assert_eq!(request.get("Po_postal"), Some("10123"));

        let request = collection_times(&config("EE"), [("Po_type", "CO")]);
        assert_eq!(request.get("Po_type"), Some("co"));
    }

    #[test]
    fn collection_times_ignores_caller_postcode() {
        let request = collection_times(&config("EE"), [("Po_postal", "99999")]);
        assert_eq!(request.get("Po_postal"), Some("10123"));
    }

    #[test]
    fn parcel_import_defaults_type() {
        let request = parcel_import([("Name1", "Jane")]);
        assert_eq!(request.get("action"), Some("parcel_import"));
        assert_eq!(request.get("Po_type"), Some("LO"));
        assert_eq!(request.get("Name1"), Some("Jane"));

        let request = parcel_import([("Po_type", "PS")]);
        assert_eq!(request.get("Po_type"), Some("PS"));
    }

    #[test]
    fn caller_cannot_change_action() {
        let request = parcel_import([("action", "parcel_print")]);
        assert_eq!(request.get("action"), Some("parcel_import"));
    }

    #[test]
    fn pickup_order_overwrites_sender_identity() {
        let request = pickup_order(
            &config("EE"),
            [("senderName", "Someone else"), ("nonStandard", "kept")],
        );
        assert_eq!(request.get("action"), Some("dpdis/pickupOrdersSave"));
        assert_eq!(request.get("senderName"), Some("Warehouse OU"));
        assert_eq!(request.get("payerName"), Some("Warehouse OU"));
        assert_eq!(request.get("senderContact"), Some("Warehouse OU"));
        assert_eq!(request.get("senderCountry"), Some("ee"));
        assert_eq!(request.get("senderCity"), Some("Tallinn"));
        assert_eq!(request.get("nonStandard"), Some("kept"));
    }

    #[test]
    fn credentials_overwrite_caller_values() {
        let mut request = parcel_import([("username", "intruder"), ("password", "guess")]);
        attach_credentials(&mut request, &config("EE"));
        assert_eq!(request.get("username"), Some("merchant"));
        assert_eq!(request.get("password"), Some("secret"));
    }

    #[test]
    fn missing_credentials_are_dropped() {
        let cfg = CarrierConfig::new(Arc::new(MemoryConfig::new())).with_code("DPD_");
        let mut request = pickup_points();
        request.insert("username", "intruder");
        attach_credentials(&mut request, &cfg);
        assert!(!request.contains("username"));
        assert!(!request.contains("password"));
    }

    #[test]
    fn print_joins_parcel_numbers() {
        let request = parcel_print(&["05808000001", "05808000002"]);
        assert_eq!(request.get("action"), Some("parcel_print"));
        assert_eq!(request.get("parcels"), Some("05808000001|05808000002"));
    }
}
