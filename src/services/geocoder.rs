use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::config::GeocoderConfig;

/// A resolved point plus the address parts stored on a bootcamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub longitude: f64,
    pub latitude: f64,
    pub formatted_address: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoder API key not configured")]
    NotConfigured,

    #[error("No location found for '{0}'")]
    NotFound(String),

    #[error("Geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeoLocation, GeocodeError>;
}

/// MapQuest geocoding API client.
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl MapQuestGeocoder {
    pub fn new(config: &GeocoderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn parse(address: &str, body: &Value) -> Result<GeoLocation, GeocodeError> {
        let location = body["results"][0]["locations"][0].as_object()
            .ok_or_else(|| GeocodeError::NotFound(address.to_string()))?;
        let text = |key: &str| {
            location.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
        };
        let (lat, lng) = match (location["latLng"]["lat"].as_f64(), location["latLng"]["lng"].as_f64()) {
            (Some(lat), Some(lng)) => (lat, lng),
            _ => return Err(GeocodeError::NotFound(address.to_string())),
        };

        let street = text("street");
        let city = text("adminArea5");
        let state = text("adminArea3");
        let zipcode = text("postalCode");
        let country = text("adminArea1");
        let region = [state.clone(), zipcode.clone()].into_iter().flatten().collect::<Vec<_>>().join(" ");
        let formatted_address = [street.clone(), city.clone(), Some(region).filter(|r| !r.is_empty()), country.clone()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");

        Ok(GeoLocation { longitude: lng, latitude: lat, formatted_address, street, city, state, zipcode, country })
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoLocation, GeocodeError> {
        let api_key = self.api_key.as_deref().ok_or(GeocodeError::NotConfigured)?;
        let body: Value = self
            .client
            .get(&self.endpoint)
            .query(&[("key", api_key), ("location", address)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Self::parse(address, &body)
    }
}

/// Fixed answers, for tests and offline development.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, GeoLocation>,
    fallback: Option<GeoLocation>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, address: impl Into<String>, location: GeoLocation) -> Self {
        self.entries.insert(address.into(), location);
        self
    }

    /// Answer for any address without an explicit entry.
    pub fn with_fallback(mut self, location: GeoLocation) -> Self {
        self.fallback = Some(location);
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoLocation, GeocodeError> {
        self.entries
            .get(address)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| GeocodeError::NotFound(address.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_mapquest_results() {
        let body = json!({"results": [{"locations": [{
            "street": "233 Bay State Rd",
            "adminArea5": "Boston",
            "adminArea3": "MA",
            "postalCode": "02215",
            "adminArea1": "US",
            "latLng": {"lat": 42.350846, "lng": -71.103216}
        }]}]});
        let loc = MapQuestGeocoder::parse("233 Bay State Rd", &body).unwrap();
        assert_eq!(loc.city.as_deref(), Some("Boston"));
        assert_eq!(loc.formatted_address, "233 Bay State Rd, Boston, MA 02215, US");
        assert!((loc.longitude + 71.103216).abs() < 1e-9);
    }

    #[test]
    fn empty_results_are_not_found() {
        let body = json!({"results": [{"locations": []}]});
        assert!(matches!(MapQuestGeocoder::parse("nowhere", &body), Err(GeocodeError::NotFound(_))));
    }

    #[tokio::test]
    async fn static_geocoder_prefers_explicit_entries() {
        let here = GeoLocation {
            longitude: 1.0, latitude: 2.0, formatted_address: "here".into(),
            street: None, city: None, state: None, zipcode: None, country: None,
        };
        let there = GeoLocation { formatted_address: "there".into(), ..here.clone() };
        let geocoder = StaticGeocoder::new().with("02118", here.clone()).with_fallback(there.clone());
        assert_eq!(geocoder.geocode("02118").await.unwrap(), here);
        assert_eq!(geocoder.geocode("anything").await.unwrap(), there);
        assert!(StaticGeocoder::new().geocode("x").await.is_err());
    }
}
