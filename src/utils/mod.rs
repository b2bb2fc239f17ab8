//! Utility functions and helpers.

pub mod datetime;
pub mod http;
pub mod log;

use url::Url;

use crate::models::VesselId;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()
        .map(|base| resolve_url(&base, href))
}

/// Extract the vessel id from a vessel link such as
/// `/vessels/some-name-mmsi-247123400-imo-0`.
pub fn extract_vessel_id(href: &str) -> Option<VesselId> {
    let pattern = regex::Regex::new(r"-mmsi-(\d+)-").ok()?;
    pattern
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|id| VesselId::new(id.as_str()))
}
