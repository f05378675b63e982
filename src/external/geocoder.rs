use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{entities::ResolvedLocation, error::Error};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationLookup: Send + Sync {
    /// Resolves coordinates to a country/city/locality. `None` means the
    /// lookup found nothing or the upstream refused the request.
    async fn resolve(&self, latitude: f64, longitude: f64)
        -> Result<Option<ResolvedLocation>, Error>;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReverseGeocodeResponse {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country_code: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    locality: String,
}

impl ReverseGeocodeResponse {
    fn into_location(self) -> Option<ResolvedLocation> {
        if self.country_code.is_empty() {
            return None;
        }

        Some(ResolvedLocation {
            latitude: self.latitude,
            longitude: self.longitude,
            alpha2code: self.country_code,
            city: non_empty(self.city),
            locality: non_empty(self.locality),
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Reverse geocoding client for BigDataCloud-compatible APIs.
#[derive(Clone, Debug)]
pub struct GeocoderClient {
    client: reqwest::Client,
    api_base: String,
    language: String,
}

impl GeocoderClient {
    pub fn new(api_base: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            language: language.into(),
        }
    }
}

#[async_trait]
impl LocationLookup for GeocoderClient {
    #[tracing::instrument(skip(self))]
    async fn resolve(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<ResolvedLocation>, Error> {
        let url = format!("{}/data/reverse-geocode-client", self.api_base);

        let res = self
            .client
            .get(url)
            .query(&[("latitude", latitude)])
            .query(&[("longitude", longitude)])
            .query(&[("localityLanguage", &self.language)])
            .send()
            .await?;

        let status_code = res.status().as_u16();

        if status_code != 200 {
            tracing::warn!(status_code, "reverse geocoding request was refused");
            return Ok(None);
        }

        let data: ReverseGeocodeResponse = res.json().await?;
        let location = data.into_location();

        if location.is_none() {
            tracing::info!("no location matched the coordinates");
        }

        Ok(location)
    }
}

#[test]
fn response_maps_to_location() {
    let data: ReverseGeocodeResponse = serde_json::from_str(
        r#"{
            "latitude": 39.78,
            "longitude": -89.65,
            "countryCode": "US",
            "countryName": "United States of America (the)",
            "city": "Springfield",
            "locality": ""
        }"#,
    )
    .unwrap();

    let location = data.into_location().unwrap();

    assert_eq!(location.alpha2code, "US");
    assert_eq!(location.city.as_deref(), Some("Springfield"));
    assert_eq!(location.locality, None);
}

#[test]
fn response_without_country_is_no_match() {
    let data: ReverseGeocodeResponse =
        serde_json::from_str(r#"{"latitude": 0.0, "longitude": -160.0, "countryCode": ""}"#)
            .unwrap();

    assert_eq!(data.into_location(), None);
}

#[test]
fn client_trims_trailing_slash() {
    let client = GeocoderClient::new("https://api.bigdatacloud.net/", "en");

    assert_eq!(client.api_base, "https://api.bigdatacloud.net");
}
