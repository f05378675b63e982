use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::ResolvedLocation;

/// A user's favorite place together with the administrative metadata
/// resolved for its coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Place {
    pub id: Option<i32>,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub locality: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Place {
    /// Unsaved place built from a geocoding result.
    pub fn new(location: ResolvedLocation, description: Option<String>) -> Self {
        Self {
            id: None,
            latitude: location.latitude,
            longitude: location.longitude,
            description,
            country: Some(location.alpha2code),
            city: location.city,
            locality: location.locality,
            created_at: None,
            updated_at: None,
        }
    }

    /// Every column the caller controls, as a change set.
    pub fn to_changes(&self) -> PlaceChanges {
        PlaceChanges {
            latitude: Some(self.latitude),
            longitude: Some(self.longitude),
            description: Some(self.description.clone()),
            country: Some(self.country.clone()),
            city: Some(self.city.clone()),
            locality: Some(self.locality.clone()),
        }
    }

    pub fn apply(&mut self, changes: &PlaceChanges) {
        if let Some(latitude) = changes.latitude {
            self.latitude = latitude;
        }
        if let Some(longitude) = changes.longitude {
            self.longitude = longitude;
        }
        if let Some(description) = &changes.description {
            self.description = description.clone();
        }
        if let Some(country) = &changes.country {
            self.country = country.clone();
        }
        if let Some(city) = &changes.city {
            self.city = city.clone();
        }
        if let Some(locality) = &changes.locality {
            self.locality = locality.clone();
        }
    }
}

/// Request body for creating or editing a place.
///
/// Omitting both coordinates on an update keeps the stored location.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceUpdate {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl PlaceUpdate {
    pub fn changes_location(&self) -> bool {
        self.latitude.is_some() || self.longitude.is_some()
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// Partial update of a stored place. `None` leaves a column untouched, while
/// `Some(None)` clears a nullable one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaceChanges {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<Option<String>>,
    pub country: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub locality: Option<Option<String>>,
}

impl PlaceChanges {
    pub fn description(description: Option<String>) -> Self {
        Self {
            description: Some(description),
            ..Default::default()
        }
    }
}

#[test]
fn zero_coordinate_counts_as_present() {
    let data = PlaceUpdate {
        latitude: Some(0.0),
        longitude: None,
        description: None,
    };

    assert!(data.changes_location());
    assert_eq!(data.coordinates(), None);
}

#[test]
fn apply_leaves_untouched_columns_alone() {
    let mut place = Place::new(
        ResolvedLocation {
            latitude: 39.78,
            longitude: -89.65,
            alpha2code: "US".into(),
            city: Some("Springfield".into()),
            locality: Some("Downtown".into()),
        },
        Some("old".into()),
    );

    place.apply(&PlaceChanges::description(Some("new".into())));

    assert_eq!(place.description.as_deref(), Some("new"));
    assert_eq!(place.country.as_deref(), Some("US"));
    assert_eq!(place.city.as_deref(), Some("Springfield"));
    assert_eq!(place.latitude, 39.78);
}

#[test]
fn update_body_accepts_missing_fields() {
    let data: PlaceUpdate = serde_json::from_str(r#"{"description": "cafe"}"#).unwrap();

    assert!(!data.changes_location());
    assert_eq!(data.description.as_deref(), Some("cafe"));
}
