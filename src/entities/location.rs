/// Result of a reverse geocoding lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub alpha2code: String,
    pub city: Option<String>,
    pub locality: Option<String>,
}
