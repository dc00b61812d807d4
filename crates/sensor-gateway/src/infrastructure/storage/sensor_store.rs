//! TOML-backed sensor store.
//!
//! All identities and configurations live in one small TOML document:
//!
//! ```toml
//! [[identity]]
//! id = "181922274938450"
//! kind = "node"
//!
//! [[identity]]
//! id = "C123456"
//! kind = "sensor"
//!
//! [[sensor]]
//! sensor_id = "C123456"
//! mode = "automatic"
//! relay_on = false
//! lower_bound = 26.0
//! upper_bound = 32.0
//! ```
//!
//! The whole document is held in memory behind one mutex.  Every mutation is
//! applied to a copy, written to `<path>.tmp`, renamed over `<path>`, and only
//! then swapped in; a failed write leaves both the file and memory unchanged.
//!
//! Writes are plain blocking `std::fs` calls made on the calling task, under
//! the lock.  The document is a few kilobytes and changes only on provisioning
//! and operator commands, so the async loops are never held up for long.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use sensor_gateway_core::{IdentityKind, ModeCommand, SensorConfig, SensorId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::application::ports::{ConfigStore, StoreError};

#[derive(Debug, Clone, Default)]
struct StoreState {
    identities: BTreeMap<SensorId, IdentityKind>,
    configs: BTreeMap<SensorId, SensorConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IdentityRecord {
    id: SensorId,
    kind: IdentityKind,
}

/// On-disk layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    identity: Vec<IdentityRecord>,
    #[serde(default)]
    sensor: Vec<SensorConfig>,
}

impl From<&StoreState> for StoreDocument {
    fn from(state: &StoreState) -> Self {
        Self {
            identity: state
                .identities
                .iter()
                .map(|(id, kind)| IdentityRecord {
                    id: id.clone(),
                    kind: *kind,
                })
                .collect(),
            sensor: state.configs.values().cloned().collect(),
        }
    }
}

impl From<StoreDocument> for StoreState {
    fn from(doc: StoreDocument) -> Self {
        let mut state = StoreState::default();
        for record in doc.identity {
            state.identities.insert(record.id, record.kind);
        }
        for config in doc.sensor {
            state
                .identities
                .entry(config.sensor_id.clone())
                .or_insert(IdentityKind::Sensor);
            state.configs.insert(config.sensor_id.clone(), config);
        }
        state
    }
}

impl StoreState {
    /// Records `id` as a sensor with a default config unless it is already
    /// one.  A node identity under the same id is a conflict.
    fn ensure_sensor(&mut self, id: &SensorId) -> Result<&SensorConfig, StoreError> {
        match self.identities.get(id).copied() {
            Some(IdentityKind::Node) => {
                return Err(StoreError::DuplicateIdentity {
                    id: id.clone(),
                    existing: IdentityKind::Node,
                })
            }
            Some(IdentityKind::Sensor) => {}
            None => {
                self.identities.insert(id.clone(), IdentityKind::Sensor);
            }
        }
        Ok(&*self
            .configs
            .entry(id.clone())
            .or_insert_with(|| SensorConfig::new_default(id.clone())))
    }

    fn node(&self) -> Option<&SensorId> {
        self.identities
            .iter()
            .find(|(_, kind)| **kind == IdentityKind::Node)
            .map(|(id, _)| id)
    }
}

/// Sensor store persisted to a TOML file, or kept purely in memory.
pub struct SensorStore {
    path: Option<PathBuf>,
    state: Mutex<StoreState>,
}

impl SensorStore {
    /// Opens the store at `path`.  A missing file is an empty store; the file
    /// is created on the first mutation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the file exists but cannot be
    /// read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let doc: StoreDocument = toml::from_str(&content).map_err(|e| {
                    StoreError::Unavailable(format!("failed to parse {}: {e}", path.display()))
                })?;
                StoreState::from(doc)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        info!(
            path = %path.display(),
            identities = state.identities.len(),
            "sensor store opened"
        );
        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    /// Runs `f` against a copy of the state, persists the copy, then commits
    /// it.  Read-only results (`f` leaving the copy untouched) skip the write.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let result = f(&mut next)?;
        if next.identities != guard.identities || next.configs != guard.configs {
            self.persist(&next)?;
            *guard = next;
        }
        Ok(result)
    }

    fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let content = toml::to_string_pretty(&StoreDocument::from(state))
            .map_err(|e| StoreError::Unavailable(format!("failed to serialize store: {e}")))?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        }
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, content).map_err(|e| io_error(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| io_error(path, e))?;

        debug!(path = %path.display(), "sensor store written");
        Ok(())
    }
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Unavailable(format!("I/O error at {}: {e}", path.display()))
}

impl ConfigStore for SensorStore {
    fn get_or_create(&self, id: &SensorId) -> Result<SensorConfig, StoreError> {
        self.mutate(|state| state.ensure_sensor(id).cloned())
    }

    fn save(&self, config: &SensorConfig) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.ensure_sensor(&config.sensor_id)?;
            state
                .configs
                .insert(config.sensor_id.clone(), config.clone());
            Ok(())
        })
    }

    fn create_identity(&self, id: &SensorId, kind: IdentityKind) -> Result<(), StoreError> {
        self.mutate(|state| {
            let known = state.identities.get(id).copied();
            match (known, kind) {
                (Some(existing), _) if existing != kind => Err(StoreError::DuplicateIdentity {
                    id: id.clone(),
                    existing,
                }),
                (_, IdentityKind::Sensor) => state.ensure_sensor(id).map(|_| ()),
                (_, IdentityKind::Node) => {
                    state.identities.insert(id.clone(), IdentityKind::Node);
                    Ok(())
                }
            }
        })
    }

    fn register_sensor(&self, id: &SensorId) -> Result<SensorConfig, StoreError> {
        self.mutate(|state| {
            if let Some(existing) = state.identities.get(id) {
                return Err(StoreError::DuplicateIdentity {
                    id: id.clone(),
                    existing: *existing,
                });
            }
            state.ensure_sensor(id).cloned()
        })
    }

    fn apply(&self, id: &SensorId, command: &ModeCommand) -> Result<SensorConfig, StoreError> {
        self.mutate(|state| {
            state.ensure_sensor(id)?;
            let config = state
                .configs
                .get_mut(id)
                .ok_or_else(|| StoreError::Unavailable(format!("config for {id} vanished")))?;
            config.apply(command);
            Ok(config.clone())
        })
    }

    fn node_identity(&self, seed: &str) -> Result<SensorId, StoreError> {
        self.mutate(|state| {
            if let Some(node) = state.node() {
                return Ok(node.clone());
            }
            let id = SensorId::parse(seed)?;
            if let Some(existing) = state.identities.get(&id) {
                return Err(StoreError::DuplicateIdentity {
                    id,
                    existing: *existing,
                });
            }
            state.identities.insert(id.clone(), IdentityKind::Node);
            info!(node = %id, "created gateway node identity");
            Ok(id)
        })
    }

    fn sensors(&self) -> Result<Vec<SensorId>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .identities
            .iter()
            .filter(|(_, kind)| **kind == IdentityKind::Sensor)
            .map(|(id, _)| id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_gateway_core::OperatingMode;
    use uuid::Uuid;

    fn sid(s: &str) -> SensorId {
        SensorId::parse(s).unwrap()
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("sensor-store-{}", Uuid::new_v4()))
            .join("sensors.toml")
    }

    #[test]
    fn test_get_or_create_twice_returns_identical_configs() {
        // Arrange
        let store = SensorStore::in_memory();

        // Act
        let first = store.get_or_create(&sid("C123456")).unwrap();
        let second = store.get_or_create(&sid("C123456")).unwrap();

        // Assert
        assert_eq!(first, second);
        assert_eq!(first, SensorConfig::new_default(sid("C123456")));
        assert_eq!(store.sensors().unwrap(), vec![sid("C123456")]);
    }

    #[test]
    fn test_save_overwrites_whole_config() {
        let store = SensorStore::in_memory();
        let mut cfg = SensorConfig::new_default(sid("C123456"));
        cfg.apply(&ModeCommand::ReportOnly);
        cfg.lower_bound = 10.0;

        store.save(&cfg).unwrap();

        assert_eq!(store.get_or_create(&sid("C123456")).unwrap(), cfg);
    }

    #[test]
    fn test_register_sensor_rejects_known_id_and_keeps_config() {
        // Arrange
        let store = SensorStore::in_memory();
        store.register_sensor(&sid("C123456")).unwrap();
        store.apply(&sid("C123456"), &ModeCommand::ReportOnly).unwrap();

        // Act
        let result = store.register_sensor(&sid("C123456"));

        // Assert
        assert!(matches!(
            result,
            Err(StoreError::DuplicateIdentity { existing: IdentityKind::Sensor, .. })
        ));
        assert_eq!(
            store.get_or_create(&sid("C123456")).unwrap().mode,
            OperatingMode::ReportOnly
        );
    }

    #[test]
    fn test_create_identity_is_idempotent_for_same_kind() {
        let store = SensorStore::in_memory();
        store.create_identity(&sid("C1"), IdentityKind::Sensor).unwrap();
        store.create_identity(&sid("C1"), IdentityKind::Sensor).unwrap();
        assert_eq!(store.sensors().unwrap(), vec![sid("C1")]);
    }

    #[test]
    fn test_create_identity_with_other_kind_is_duplicate() {
        let store = SensorStore::in_memory();
        store.create_identity(&sid("N1"), IdentityKind::Node).unwrap();
        assert!(matches!(
            store.create_identity(&sid("N1"), IdentityKind::Sensor),
            Err(StoreError::DuplicateIdentity { existing: IdentityKind::Node, .. })
        ));
    }

    #[test]
    fn test_sensor_identity_always_has_config() {
        let store = SensorStore::in_memory();
        store.create_identity(&sid("C7"), IdentityKind::Sensor).unwrap();
        let guard = store.lock().unwrap();
        assert!(guard.configs.contains_key(&sid("C7")));
    }

    #[test]
    fn test_node_identity_is_stable_and_ignores_later_seeds() {
        let store = SensorStore::in_memory();
        let first = store.node_identity("181922274938450").unwrap();
        let second = store.node_identity("999").unwrap();
        assert_eq!(first, sid("181922274938450"));
        assert_eq!(first, second);
        assert!(store.sensors().unwrap().is_empty(), "node is not a sensor");
    }

    #[test]
    fn test_node_identity_rejects_invalid_seed() {
        let store = SensorStore::in_memory();
        assert!(matches!(
            store.node_identity("aa:bb"),
            Err(StoreError::InvalidIdentity(_))
        ));
    }

    #[test]
    fn test_apply_upserts_and_keeps_inverted_bounds() {
        let store = SensorStore::in_memory();
        let cfg = store
            .apply(&sid("C9"), &ModeCommand::Automatic { upper: 20.0, lower: 30.0 })
            .unwrap();
        assert_eq!(cfg.upper_bound, 20.0);
        assert_eq!(cfg.lower_bound, 30.0);
    }

    #[test]
    fn test_state_survives_reopen() {
        // Arrange
        let path = temp_path();
        {
            let store = SensorStore::open(&path).unwrap();
            store.node_identity("42").unwrap();
            store.register_sensor(&sid("C123456")).unwrap();
            store
                .apply(&sid("C123456"), &ModeCommand::Automatic { upper: 32.5, lower: 28.0 })
                .unwrap();
        }

        // Act
        let reopened = SensorStore::open(&path).unwrap();

        // Assert
        assert_eq!(reopened.node_identity("7").unwrap(), sid("42"));
        let cfg = reopened.get_or_create(&sid("C123456")).unwrap();
        assert_eq!(cfg.upper_bound, 32.5);
        assert_eq!(cfg.lower_bound, 28.0);
        assert_eq!(reopened.sensors().unwrap(), vec![sid("C123456")]);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file_is_empty_store_and_not_created_by_reads() {
        let path = temp_path();
        let store = SensorStore::open(&path).unwrap();
        assert!(store.sensors().unwrap().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_is_unavailable() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "identity = 5").unwrap();

        assert!(matches!(
            SensorStore::open(&path),
            Err(StoreError::Unavailable(_))
        ));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
