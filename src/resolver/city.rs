use tracing::{debug, warn};

use super::{ReconciliationOutcome, Resolver, ResolverOptions, reconcile};
use crate::catalog::{CatalogTable, City, Geocoder};
use crate::city::seems_the_same;
use crate::error::ConstructionError;

pub struct CityResolver<'g> {
    parsed: City,
    options: ResolverOptions,
    geocoder: Option<&'g dyn Geocoder>,
    outcomes: Vec<ReconciliationOutcome<City>>,
}

impl<'g> CityResolver<'g> {
    /// Empty area or country codes act as wildcards when matching.
    pub fn new(
        name: &str,
        area_code: &str,
        country_code: &str,
        options: ResolverOptions,
    ) -> Result<Self, ConstructionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConstructionError::Missing("city name"));
        }
        Ok(CityResolver {
            parsed: City {
                name: name.to_string(),
                area_code: area_code.trim().to_uppercase(),
                country_code: country_code.trim().to_uppercase(),
                ..City::default()
            },
            options,
            geocoder: None,
            outcomes: Vec::new(),
        })
    }

    pub fn with_geocoder(mut self, geocoder: &'g dyn Geocoder) -> Self {
        self.geocoder = Some(geocoder);
        self
    }
}

fn or_wildcard<'a>(parsed: &'a str, stored: &'a str) -> &'a str {
    if parsed.is_empty() { stored } else { parsed }
}

impl Resolver for CityResolver<'_> {
    type Entity = City;

    fn find_or_create<C>(&mut self, catalog: &mut C) -> &[ReconciliationOutcome<City>]
    where
        C: CatalogTable<City> + ?Sized,
    {
        let parsed = self.parsed.clone();
        let fuzzy = |candidates: &[City]| {
            candidates
                .iter()
                .find(|c| {
                    seems_the_same(
                        &c.name,
                        &parsed.name,
                        &c.area_code,
                        or_wildcard(&parsed.area_code, &c.area_code),
                        &c.country_code,
                        or_wildcard(&parsed.country_code, &c.country_code),
                    )
                })
                .cloned()
        };

        let geocoder = if self.options.skip_geocoding {
            None
        } else {
            self.geocoder
        };
        let geocode = |city: &mut City| {
            let Some(geocoder) = geocoder else {
                return;
            };
            let query = if city.area_code.is_empty() {
                city.name.clone()
            } else {
                format!("{} ({})", city.name, city.area_code)
            };
            match geocoder.lookup(&query) {
                Ok(place) => {
                    debug!(city = %city.name, locality = %place.locality, "geocoded");
                    city.latitude = Some(place.latitude);
                    city.longitude = Some(place.longitude);
                    if city.area_code.is_empty() {
                        city.area_code = place.area_code;
                    }
                    if city.country_code.is_empty() {
                        city.country_code = place.country_code;
                    }
                }
                Err(err) => warn!(city = %city.name, error = %err, "geocoding failed"),
            }
        };

        let outcome = reconcile(catalog, &self.options, self.parsed.clone(), fuzzy, geocode);
        self.outcomes = vec![outcome];
        &self.outcomes
    }

    fn outcomes(&self) -> &[ReconciliationOutcome<City>] {
        &self.outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityKind, GazetteerGeocoder, MemoryCatalog, PlaceResult};
    use crate::resolver::DiffLog;

    fn stored(catalog: &mut MemoryCatalog, name: &str, area: &str) -> City {
        catalog
            .create(City {
                name: name.into(),
                area_code: area.into(),
                country_code: "IT".into(),
                ..City::default()
            })
            .unwrap()
    }

    #[test]
    fn test_empty_name_is_construction_error() {
        let err = CityResolver::new("  ", "RA", "IT", ResolverOptions::default()).err();
        assert_eq!(err, Some(ConstructionError::Missing("city name")));
    }

    #[test]
    fn test_find_or_create_is_idempotent() {
        let mut catalog = MemoryCatalog::new();
        let mut resolver = CityResolver::new("Ravenna", "ra", "IT", ResolverOptions::default()).unwrap();

        resolver.find_or_create(&mut catalog);
        assert!(resolver.has_created());
        assert_eq!(resolver.result_entity().map(|c| c.area_code.as_str()), Some("RA"));

        resolver.find_or_create(&mut catalog);
        assert!(!resolver.has_created());
        assert!(!resolver.has_updated());
        assert!(!resolver.has_changes());
        assert_eq!(catalog.len_of(EntityKind::City), 1);
    }

    #[test]
    fn test_elided_name_found_fuzzily() {
        let mut catalog = MemoryCatalog::new();
        let existing = stored(&mut catalog, "Reggio nell'Emilia", "RE");
        stored(&mut catalog, "Reggio Calabria", "RC");

        let mut resolver = CityResolver::new("Reggio Emilia", "RE", "IT", ResolverOptions::default()).unwrap();
        resolver.find_or_create(&mut catalog);
        assert!(!resolver.has_changes());
        assert_eq!(resolver.result_entity().map(|c| c.id), Some(existing.id));

        let mut log = DiffLog::new();
        resolver.report(&mut log);
        assert_eq!(log.lines(), ["City found! #1 Reggio nell'Emilia (RE)"]);
    }

    #[test]
    fn test_area_mismatch_creates() {
        let mut catalog = MemoryCatalog::new();
        stored(&mut catalog, "Reggio nell'Emilia", "RE");
        let mut resolver = CityResolver::new("Reggio Emilia", "RC", "IT", ResolverOptions::default()).unwrap();
        resolver.find_or_create(&mut catalog);
        assert!(resolver.has_created());
        assert_eq!(catalog.len_of(EntityKind::City), 2);
    }

    #[test]
    fn test_missing_area_acts_as_wildcard() {
        let mut catalog = MemoryCatalog::new();
        stored(&mut catalog, "Forlì", "FC");
        let mut resolver = CityResolver::new("FORLI'", "", "", ResolverOptions::default()).unwrap();
        resolver.find_or_create(&mut catalog);
        assert!(!resolver.has_changes());
        assert_eq!(resolver.result_entity().map(|c| c.area_code.as_str()), Some("FC"));
    }

    #[test]
    fn test_geocoder_fills_new_city() {
        let gazetteer = GazetteerGeocoder::new(vec![PlaceResult {
            formatted_address: "Cervia".into(),
            latitude: 44.26,
            longitude: 12.35,
            locality: "Cervia".into(),
            area_code: "RA".into(),
            country_code: "IT".into(),
        }]);
        let options = ResolverOptions {
            skip_geocoding: false,
            ..ResolverOptions::default()
        };
        let mut catalog = MemoryCatalog::new();
        let mut resolver = CityResolver::new("Cervia", "", "", options)
            .unwrap()
            .with_geocoder(&gazetteer);
        resolver.find_or_create(&mut catalog);
        let city = resolver.result_entity().unwrap();
        assert_eq!(city.area_code, "RA");
        assert_eq!(city.latitude, Some(44.26));

        let mut skipped = CityResolver::new("Cervia", "", "", ResolverOptions::default())
            .unwrap()
            .with_geocoder(&gazetteer);
        skipped.find_or_create(&mut MemoryCatalog::new());
        assert_eq!(skipped.result_entity().and_then(|c| c.latitude), None);
    }

    #[test]
    fn test_write_rejection_sets_errors() {
        let mut catalog = MemoryCatalog::new();
        catalog.fail_writes_for(EntityKind::City);
        let mut resolver = CityResolver::new("Ravenna", "RA", "IT", ResolverOptions::default()).unwrap();
        resolver.find_or_create(&mut catalog);
        assert!(resolver.has_errors());
        assert!(resolver.result_entity().is_none());
    }
}
