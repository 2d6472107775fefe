//! Utility functions for AWS identifier formats

use once_cell::sync::Lazy;
use regex::Regex;

static REGION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2}(-gov)?-[a-z]+-\d$").expect("Invalid region regex"));

static AMI_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ami-[0-9a-f]{8,17}$").expect("Invalid AMI id regex"));

static TGW_ATTACHMENT_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^tgw-attach-[0-9a-f]+$").expect("Invalid attachment id regex")
});

/// Region codes like "ap-northeast-1"
pub fn is_valid_region(s: &str) -> bool {
    REGION_REGEX.is_match(s)
}

/// Availability zones are a region code followed by one zone letter
pub fn is_valid_availability_zone(s: &str) -> bool {
    match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_lowercase() => is_valid_region(&s[..i]),
        _ => false,
    }
}

pub fn is_valid_ami_id(s: &str) -> bool {
    AMI_ID_REGEX.is_match(s)
}

pub fn is_valid_tgw_attachment_id(s: &str) -> bool {
    TGW_ATTACHMENT_ID_REGEX.is_match(s)
}

/// Normalize region value (e.g., "ap_northeast_1" -> "ap-northeast-1")
pub fn normalize_region(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace('_', "-")
}

/// Availability zone inside a region (e.g., ("ap-northeast-1", 'c') -> "ap-northeast-1c")
pub fn availability_zone(region: &str, zone: char) -> String {
    format!("{}{}", normalize_region(region), zone)
}

/// Interface endpoint service name (e.g., "com.amazonaws.ap-northeast-1.ssm")
pub fn endpoint_service_name(region: &str, service: &str) -> String {
    format!("com.amazonaws.{}.{}", normalize_region(region), service)
}

/// Alphanumeric form of a name, usable inside a logical ID ("TGW-Attachment" -> "TGWAttachment")
pub fn logical_id_fragment(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}
