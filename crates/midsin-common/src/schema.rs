//! Schema versioning for serialized records and settings files.

/// Version stamped on every serialized record and expected in settings files.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Whether `version` can be read by this build (same major version).
pub fn is_compatible(version: &str) -> bool {
    let major = |v: &str| v.split('.').next().and_then(|m| m.parse::<u32>().ok());
    match (major(version), major(SCHEMA_VERSION)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
