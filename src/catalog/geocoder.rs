use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::city::search_composed_name;
use crate::error::{CatalogResult, GeocodeError};
use crate::fuzzy::MatchThresholds;

/// Structured answer of a geocoding lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceResult {
    pub formatted_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub locality: String,
    pub area_code: String,
    pub country_code: String,
}

/// Free-text address to place.
pub trait Geocoder {
    fn lookup(&self, address: &str) -> Result<PlaceResult, GeocodeError>;
}

/// Offline geocoder over a table of known localities.
///
/// The address is split on commas and dashes; components are tried from the
/// last one backwards, since Italian addresses end with the locality.
#[derive(Debug, Default)]
pub struct GazetteerGeocoder {
    places: Vec<PlaceResult>,
    thresholds: MatchThresholds,
}

impl GazetteerGeocoder {
    pub fn new(places: Vec<PlaceResult>) -> Self {
        GazetteerGeocoder {
            places,
            thresholds: MatchThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: MatchThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Load a JSON array of [`PlaceResult`].
    pub fn load(path: &Path) -> CatalogResult<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(Self::new(serde_json::from_str(&raw)?))
    }
}

impl Geocoder for GazetteerGeocoder {
    fn lookup(&self, address: &str) -> Result<PlaceResult, GeocodeError> {
        if self.places.is_empty() {
            return Err(GeocodeError::Unavailable("empty gazetteer".to_string()));
        }
        let components: Vec<&str> = address
            .split([',', '-', '–'])
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();

        for component in components.iter().rev() {
            if let Some(place) =
                search_composed_name(component, &self.places, |p| p.locality.clone(), self.thresholds)
            {
                debug!(address, locality = %place.locality, "gazetteer hit");
                return Ok(PlaceResult {
                    formatted_address: format!("{}, {}", address.trim(), place.locality),
                    ..place.clone()
                });
            }
        }
        Err(GeocodeError::ZeroResults(address.to_string()))
    }
}
