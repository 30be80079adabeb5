use meet_types::PoolDescriptor;
use tracing::{debug, warn};

use super::{ReconciliationOutcome, Resolver, ResolverOptions, reconcile};
use crate::catalog::{CatalogTable, City, Geocoder, SwimmingPool};
use crate::error::ConstructionError;
use crate::fuzzy::FuzzyStringMatcher;
use crate::normalize::get_swimming_pool_nickname;

pub struct SwimmingPoolResolver<'g> {
    parsed: SwimmingPool,
    city_name: String,
    options: ResolverOptions,
    geocoder: Option<&'g dyn Geocoder>,
    outcomes: Vec<ReconciliationOutcome<SwimmingPool>>,
}

impl<'g> SwimmingPoolResolver<'g> {
    pub fn new(
        descriptor: &PoolDescriptor,
        city: &City,
        options: ResolverOptions,
    ) -> Result<Self, ConstructionError> {
        if descriptor.name_tokens.is_empty() {
            return Err(ConstructionError::Missing("pool name tokens"));
        }
        if descriptor.lanes_number == 0 {
            return Err(ConstructionError::Invalid {
                field: "lanes_number",
                reason: "must be positive".to_string(),
            });
        }
        let parsed = SwimmingPool {
            name: descriptor.name(),
            nick_name: get_swimming_pool_nickname(
                &city.name,
                &descriptor.name_tokens,
                descriptor.pool_type,
            ),
            address: descriptor.address(),
            city_id: city.id,
            pool_type: descriptor.pool_type,
            lanes_number: descriptor.lanes_number,
            ..SwimmingPool::default()
        };
        Ok(SwimmingPoolResolver {
            parsed,
            city_name: city.name.clone(),
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

impl Resolver for SwimmingPoolResolver<'_> {
    type Entity = SwimmingPool;

    fn find_or_create<C>(&mut self, catalog: &mut C) -> &[ReconciliationOutcome<SwimmingPool>]
    where
        C: CatalogTable<SwimmingPool> + ?Sized,
    {
        let parsed = self.parsed.clone();
        let thresholds = self.options.thresholds;
        // Same facility name in the same city, course length not contradicting
        let fuzzy = |candidates: &[SwimmingPool]| {
            let compatible: Vec<SwimmingPool> = candidates
                .iter()
                .filter(|p| p.pool_type.is_none() || parsed.pool_type.is_none() || p.pool_type == parsed.pool_type)
                .cloned()
                .collect();
            FuzzyStringMatcher::new(&compatible, |p| p.name.clone())
                .with_thresholds(thresholds)
                .find(&parsed.name)
                .cloned()
        };

        let geocoder = if self.options.skip_geocoding {
            None
        } else {
            self.geocoder
        };
        let city_name = &self.city_name;
        let geocode = |pool: &mut SwimmingPool| {
            let Some(geocoder) = geocoder else {
                return;
            };
            let query = if pool.address.is_empty() {
                format!("{}, {city_name}", pool.name)
            } else {
                format!("{}, {city_name}", pool.address)
            };
            match geocoder.lookup(&query) {
                Ok(place) => {
                    debug!(pool = %pool.nick_name, address = %place.formatted_address, "geocoded");
                    pool.latitude = Some(place.latitude);
                    pool.longitude = Some(place.longitude);
                }
                Err(err) => warn!(pool = %pool.nick_name, error = %err, "geocoding failed"),
            }
        };

        let outcome = reconcile(catalog, &self.options, self.parsed.clone(), fuzzy, geocode);
        self.outcomes = vec![outcome];
        &self.outcomes
    }

    fn outcomes(&self) -> &[ReconciliationOutcome<SwimmingPool>] {
        &self.outcomes
    }
}
