use crate::data::parse_aqi;
use geo::MultiPolygon;

/// One CSV row: a country label, the AQI cell as read, and its parsed value.
#[derive(Debug, Clone, PartialEq)]
pub struct AqiRecord {
    pub country: String,
    pub aqi: Option<f64>,
    pub raw: String,
}

impl AqiRecord {
    pub fn from_raw(country: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            country: country.into(),
            aqi: parse_aqi(&raw),
            raw,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CountryFeature {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}
