//! Reusable attribute validators
//!
//! Each validator has the shape expected by [`AttributeSpec::validate`]:
//! it receives the candidate value and returns whether it is acceptable.
//!
//! [`AttributeSpec::validate`]: super::AttributeSpec::validate

use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)*(?::\d{1,5})?(?:[/?#][^\s]*)?$")
        .expect("URL regex must compile")
});

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-8][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}$")
        .expect("UUID regex must compile")
});

static IMS_ORG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Za-z]{24}@[A-Za-z]+Org$").expect("IMS org regex must compile")
});

/// http(s) URL with a host
pub fn is_valid_url(value: &Value) -> bool {
    value.as_str().map(|s| URL_REGEX.is_match(s)).unwrap_or(false)
}

/// RFC 4122 UUID string
pub fn is_uuid(value: &Value) -> bool {
    value.as_str().map(|s| UUID_REGEX.is_match(s)).unwrap_or(false)
}

/// RFC 3339 / ISO 8601 timestamp string
pub fn is_iso_date(value: &Value) -> bool {
    value
        .as_str()
        .map(|s| DateTime::parse_from_rfc3339(s).is_ok())
        .unwrap_or(false)
}

/// JSON object with at least one key
pub fn is_non_empty_object(value: &Value) -> bool {
    value.as_object().map(|o| !o.is_empty()).unwrap_or(false)
}

/// Whole number
pub fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64()
}

/// Number strictly greater than zero
pub fn is_positive(value: &Value) -> bool {
    value.as_f64().map(|n| n > 0.0).unwrap_or(false)
}

/// IMS organization id, e.g. `1234567890ABCDEF12345678@AdobeOrg`
pub fn is_ims_org_id(value: &Value) -> bool {
    value.as_str().map(|s| IMS_ORG_REGEX.is_match(s)).unwrap_or(false)
}
