//! Durable backing for the spot map.
//!
//! The whole map is rewritten on every save as one tab-indented JSON object
//! keyed by composite key. Writes go to a sibling `.tmp` file that is renamed
//! over the live file, so a crash mid-save never leaves a half-written store.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::{debug, info, warn};

use crate::domain::spot::Spot;
use crate::errors::RegistryError;

pub type SpotMap = BTreeMap<String, Spot>;

#[derive(Debug)]
pub struct Store {
    data_dir: PathBuf,
    data_file: String,
    spots: SpotMap,
}

impl Store {
    /// Creates the data directory if needed and hydrates the map from disk.
    pub fn open(
        data_dir: impl Into<PathBuf>,
        data_file: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let mut store =
            Self { data_dir: data_dir.into(), data_file: data_file.into(), spots: SpotMap::new() };

        fs::create_dir_all(&store.data_dir)
            .map_err(|error| RegistryError::io(&store.data_dir, error))?;
        store.load()?;

        info!(
            event_name = "spot.store.opened",
            path = %store.file_path().display(),
            spot_count = store.spots.len(),
            "spot store opened"
        );
        Ok(store)
    }

    /// Replaces the in-memory map with the file contents.
    ///
    /// A missing file is recreated empty. A file that cannot be decoded leaves
    /// the current map untouched.
    pub fn load(&mut self) -> Result<(), RegistryError> {
        let path = self.file_path();
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                info!(
                    event_name = "spot.store.created",
                    path = %path.display(),
                    "no spot data file to load, creating one"
                );
                self.spots.clear();
                return self.save();
            }
            Err(error) => return Err(RegistryError::io(&path, error)),
        };

        let decoded = decode(&raw).map_err(|error| {
            warn!(
                event_name = "spot.store.corrupt",
                path = %path.display(),
                error = %error,
                "spot data file could not be decoded"
            );
            RegistryError::StoreCorrupt { path: path.clone(), detail: error.to_string() }
        })?;

        self.spots = rekey(decoded);
        debug!(
            event_name = "spot.store.loaded",
            path = %path.display(),
            spot_count = self.spots.len(),
            "spot data loaded"
        );
        Ok(())
    }

    pub fn save(&self) -> Result<(), RegistryError> {
        let path = self.file_path();
        let encoded = encode(&self.spots).map_err(|error| RegistryError::StoreIo {
            path: path.clone(),
            detail: format!("could not encode spot store: {error}"),
        })?;

        fs::create_dir_all(&self.data_dir)
            .map_err(|error| RegistryError::io(&self.data_dir, error))?;
        write_atomically(&path, &encoded).map_err(|error| {
            warn!(
                event_name = "spot.store.save_failed",
                path = %path.display(),
                error = %error,
                "error saving spot store"
            );
            RegistryError::io(&path, error)
        })
    }

    pub fn insert(&mut self, spot: Spot) -> Option<Spot> {
        self.spots.insert(spot.key(), spot)
    }

    pub fn delete(&mut self, key: &str) -> Option<Spot> {
        self.spots.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Spot> {
        self.spots.get(key)
    }

    pub fn spots(&self) -> &SpotMap {
        &self.spots
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    pub fn file_path(&self) -> PathBuf {
        self.data_dir.join(&self.data_file)
    }
}

/// Reads a store file without creating or rewriting it. A missing file is an empty store.
pub fn read_snapshot(path: &Path) -> Result<SpotMap, RegistryError> {
    match fs::read(path) {
        Ok(raw) => decode(&raw)
            .map(rekey)
            .map_err(|error| RegistryError::StoreCorrupt {
                path: path.to_path_buf(),
                detail: error.to_string(),
            }),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(SpotMap::new()),
        Err(error) => Err(RegistryError::io(path, error)),
    }
}

pub fn encode(spots: &SpotMap) -> Result<Vec<u8>, serde_json::Error> {
    let mut buffer = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"\t"));
    spots.serialize(&mut serializer)?;
    Ok(buffer)
}

/// Whitespace-only input decodes to an empty map.
pub fn decode(raw: &[u8]) -> Result<SpotMap, serde_json::Error> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(SpotMap::new());
    }
    serde_json::from_slice(raw)
}

/// Rebuilds the map under each record's own key.
///
/// When two stored entries compute the same key, the one whose stored key
/// already matches wins; otherwise the first in stored-key order is kept.
fn rekey(decoded: SpotMap) -> SpotMap {
    let mut spots = SpotMap::new();
    for (stored_key, spot) in decoded {
        let key = spot.key();
        let in_place = stored_key == key;
        if !in_place {
            warn!(
                event_name = "spot.store.rekeyed",
                stored_key = %stored_key,
                key = %key,
                "stored key did not match registration; re-keyed"
            );
        }

        match spots.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(spot);
            }
            Entry::Occupied(mut slot) => {
                let (kept, dropped) = if in_place {
                    (spot.clone(), slot.insert(spot))
                } else {
                    (slot.get().clone(), spot)
                };
                warn!(
                    event_name = "spot.store.key_collision",
                    key = %slot.key(),
                    kept_by = %kept.registered_by,
                    dropped_by = %dropped.registered_by,
                    dropped_stored_key = %stored_key,
                    "two stored registrations share a key; keeping one"
                );
            }
        }
    }
    spots
}

fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let temp_path = temp_path_for(path);
    let result = (|| -> io::Result<()> {
        let mut file = File::create(&temp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
