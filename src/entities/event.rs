use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::entities::Place;

/// Payload announcing a country/city pair to the countries informer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct CountryCityDto {
    pub city: String,
    #[validate(length(equal = 2))]
    pub alpha2code: String,
}

impl CountryCityDto {
    /// Builds and validates the payload for a place. A place without a
    /// country code never yields a payload.
    pub fn from_place(place: &Place) -> Result<Self, ValidationErrors> {
        let alpha2code = match &place.country {
            Some(country) => country.clone(),
            None => {
                let mut errors = ValidationErrors::new();
                errors.add("alpha2code", ValidationError::new("required"));
                return Err(errors);
            }
        };

        let dto = Self {
            city: place.city.clone().unwrap_or_default(),
            alpha2code,
        };
        dto.validate()?;

        Ok(dto)
    }
}

#[cfg(test)]
fn place_in(country: Option<&str>, city: Option<&str>) -> Place {
    Place {
        id: Some(1),
        latitude: 39.78,
        longitude: -89.65,
        description: None,
        country: country.map(Into::into),
        city: city.map(Into::into),
        locality: None,
        created_at: None,
        updated_at: None,
    }
}

#[test]
fn missing_city_becomes_empty_string() {
    let dto = CountryCityDto::from_place(&place_in(Some("US"), None)).unwrap();

    assert_eq!(dto.city, "");
    assert_eq!(
        serde_json::to_value(&dto).unwrap(),
        serde_json::json!({"city": "", "alpha2code": "US"})
    );
}

#[test]
fn missing_country_is_rejected() {
    let errors = CountryCityDto::from_place(&place_in(None, Some("Springfield"))).unwrap_err();

    assert!(errors.field_errors().contains_key("alpha2code"));
}

#[test]
fn malformed_country_is_rejected() {
    assert!(CountryCityDto::from_place(&place_in(Some("USA"), Some("Springfield"))).is_err());
    assert!(CountryCityDto::from_place(&place_in(Some(""), Some("Springfield"))).is_err());
}
