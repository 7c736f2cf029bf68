/// Snapshot of the external geolocation source.
///
/// The device/platform side is not modeled here; callers feed whatever the
/// platform reported into the session.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoStatus {
    /// The source has not produced a position yet.
    Loading,
    /// Device coordinates are available.
    Ready { lat: f64, lon: f64 },
    /// The source failed (unavailable, permission denied, ...). The message
    /// is surfaced to the user verbatim.
    Failed(String),
}

impl GeoStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}
