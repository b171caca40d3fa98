//! Independent fields hosted side by side.

use crate::field::{Field, FieldStats};
use crate::registry::SpeciesRegistry;
use dashmap::DashMap;
use parking_lot::Mutex;
use savanna_core::{FieldConfig, Result, SessionId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub type SharedField = Arc<Mutex<Field>>;

/// Sessions keyed by id. Each field sits behind its own mutex, so ticks and
/// additions on one session are serialized while sessions run in parallel.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SharedField>,
    species: Arc<SpeciesRegistry>,
    field_config: FieldConfig,
    created: AtomicU64,
}

impl SessionRegistry {
    pub fn new(field_config: FieldConfig, species: Arc<SpeciesRegistry>) -> Self {
        Self {
            sessions: DashMap::new(),
            species,
            field_config,
            created: AtomicU64::new(0),
        }
    }

    pub fn species(&self) -> &Arc<SpeciesRegistry> {
        &self.species
    }

    /// Create a new empty field. Each session gets its own seed derived from
    /// the configured one.
    #[instrument(skip(self))]
    pub fn create(&self) -> Result<SessionId> {
        let ordinal = self.created.fetch_add(1, Ordering::Relaxed);
        let config = FieldConfig {
            seed: self.field_config.seed.wrapping_add(ordinal),
            ..self.field_config.clone()
        };
        let field = Field::new(&config, Arc::clone(&self.species))?;

        let id = SessionId::new();
        self.sessions.insert(id, Arc::new(Mutex::new(field)));
        info!(session_id = %id, seed = config.seed, "Session created");
        Ok(id)
    }

    pub fn get(&self, id: SessionId) -> Option<SharedField> {
        self.sessions.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            debug!(session_id = %id, "Session removed");
        }
        removed
    }

    /// Run `f` with exclusive access to a session's field
    pub fn with_field<T>(&self, id: SessionId, f: impl FnOnce(&mut Field) -> T) -> Option<T> {
        let field = self.get(id)?;
        let mut guard = field.lock();
        Some(f(&mut guard))
    }

    pub fn stats(&self, id: SessionId) -> Option<FieldStats> {
        self.with_field(id, |field| field.stats())
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use savanna_core::{Position, LION_SYMBOL};
    use std::thread;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(FieldConfig::default(), Arc::new(SpeciesRegistry::new()))
    }

    #[test]
    fn test_create_get_remove() {
        let sessions = registry();
        let id = sessions.create().unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(sessions.get(id).is_some());
        assert_eq!(sessions.ids(), vec![id]);

        assert!(sessions.remove(id));
        assert!(!sessions.remove(id));
        assert!(sessions.is_empty());
        assert!(sessions.with_field(id, |f| f.tick()).is_none());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let sessions = registry();
        let a = sessions.create().unwrap();
        let b = sessions.create().unwrap();

        sessions
            .with_field(a, |field| field.add_entity(LION_SYMBOL, Position::new(1, 1)))
            .unwrap()
            .unwrap();
        sessions.with_field(a, |field| field.update());

        assert_eq!(sessions.stats(a).unwrap().total_population(), 1);
        assert_eq!(sessions.stats(a).unwrap().tick, 1);
        assert_eq!(sessions.stats(b).unwrap().total_population(), 0);
        assert_eq!(sessions.stats(b).unwrap().tick, 0);
    }

    #[test]
    fn test_parallel_ticks() {
        let sessions = Arc::new(registry());
        let ids: Vec<SessionId> = (0..4).map(|_| sessions.create().unwrap()).collect();
        for id in &ids {
            sessions.with_field(*id, |field| {
                field.add_entity(LION_SYMBOL, Position::new(0, 0)).unwrap();
            });
        }

        let handles: Vec<_> = ids
            .iter()
            .map(|&id| {
                let sessions = Arc::clone(&sessions);
                thread::spawn(move || {
                    for _ in 0..10 {
                        sessions.with_field(id, |field| field.update());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for id in ids {
            assert_eq!(sessions.stats(id).unwrap().tick, 10);
        }
    }
}
