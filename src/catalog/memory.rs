use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{CatalogTable, City, Entity, EntityKind, Meeting, MeetingEvent, MeetingSession, SwimmingPool};
use crate::error::{CatalogError, CatalogResult};

/// In-process catalog, persisted as a single JSON document.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MemoryCatalog {
    #[serde(default)]
    cities: Vec<City>,
    #[serde(default)]
    swimming_pools: Vec<SwimmingPool>,
    #[serde(default)]
    meetings: Vec<Meeting>,
    #[serde(default)]
    meeting_sessions: Vec<MeetingSession>,
    #[serde(default)]
    meeting_events: Vec<MeetingEvent>,
    #[serde(skip)]
    rejected: HashSet<EntityKind>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a catalog snapshot; a missing file is an empty catalog.
    pub fn load(path: &Path) -> CatalogResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> CatalogResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Make every later create or update of `kind` fail.
    pub fn fail_writes_for(&mut self, kind: EntityKind) {
        self.rejected.insert(kind);
    }

    pub fn len_of(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::City => self.cities.len(),
            EntityKind::SwimmingPool => self.swimming_pools.len(),
            EntityKind::Meeting => self.meetings.len(),
            EntityKind::MeetingSession => self.meeting_sessions.len(),
            EntityKind::MeetingEvent => self.meeting_events.len(),
        }
    }

    fn check_writable(&self, kind: EntityKind) -> CatalogResult<()> {
        if self.rejected.contains(&kind) {
            return Err(CatalogError::WriteRejected {
                kind,
                reason: "store refused the write".to_string(),
            });
        }
        Ok(())
    }
}

/// Row storage for one entity kind.
pub trait Table<E> {
    fn rows(&self) -> &[E];
    fn rows_mut(&mut self) -> &mut Vec<E>;
}

macro_rules! table {
    ($entity:ty, $field:ident) => {
        impl Table<$entity> for MemoryCatalog {
            fn rows(&self) -> &[$entity] {
                &self.$field
            }

            fn rows_mut(&mut self) -> &mut Vec<$entity> {
                &mut self.$field
            }
        }
    };
}

table!(City, cities);
table!(SwimmingPool, swimming_pools);
table!(Meeting, meetings);
table!(MeetingSession, meeting_sessions);
table!(MeetingEvent, meeting_events);

impl<E> CatalogTable<E> for MemoryCatalog
where
    E: Entity,
    MemoryCatalog: Table<E>,
{
    fn find_by_key(&self, scope: Option<u64>, key: &str) -> Option<E> {
        Table::<E>::rows(self)
            .iter()
            .find(|e| (scope.is_none() || e.scope() == scope) && e.lookup_key() == key)
            .cloned()
    }

    fn candidates(&self, scope: Option<u64>) -> Vec<E> {
        Table::<E>::rows(self)
            .iter()
            .filter(|e| scope.is_none() || e.scope() == scope)
            .cloned()
            .collect()
    }

    fn create(&mut self, mut entity: E) -> CatalogResult<E> {
        self.check_writable(E::KIND)?;
        let next = Table::<E>::rows(self).iter().map(Entity::id).max().unwrap_or(0) + 1;
        entity.set_id(next);
        Table::<E>::rows_mut(self).push(entity.clone());
        Ok(entity)
    }

    fn update(&mut self, entity: &E) -> CatalogResult<()> {
        self.check_writable(E::KIND)?;
        let id = entity.id();
        let slot = Table::<E>::rows_mut(self)
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or(CatalogError::NotFound { kind: E::KIND, id })?;
        *slot = entity.clone();
        Ok(())
    }
}
