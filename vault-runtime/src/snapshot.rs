//! Persisted label → address mapping written at the end of a deployment and
//! read back by the follow-up scripts.

use std::fmt;
use std::path::PathBuf;

use alloy::primitives::Address;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;

use crate::error::DeployError;

/// Flat, ordered label → address mapping. Serializes as a JSON object whose
/// keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSnapshot {
    entries: Vec<(String, Address)>,
}

impl AddressSnapshot {
    /// Append or overwrite an entry. Overwriting keeps the original position.
    pub fn push(&mut self, label: impl Into<String>, address: Address) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = address,
            None => self.entries.push((label, address)),
        }
    }

    pub fn get(&self, label: &str) -> Option<Address> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, address)| *address)
    }

    /// Like [`get`](Self::get) but failing with `UnresolvedReference`.
    pub fn address(&self, label: &str) -> Result<Address, DeployError> {
        self.get(label).ok_or_else(|| DeployError::UnresolvedReference {
            name: label.to_string(),
            required_by: "address snapshot".to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Address)> {
        self.entries.iter().map(|(l, a)| (l.as_str(), *a))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<Vec<u8>, DeployError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, DeployError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl Serialize for AddressSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, address) in &self.entries {
            map.serialize_entry(label, &address.to_checksum(None))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AddressSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = AddressSnapshot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of labels to addresses")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut snapshot = AddressSnapshot::default();
                while let Some((label, address)) = access.next_entry::<String, String>()? {
                    let address: Address = address.parse().map_err(|e| {
                        serde::de::Error::custom(format!("invalid address for '{label}': {e}"))
                    })?;
                    snapshot.push(label, address);
                }
                Ok(snapshot)
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

/// Opaque byte storage keyed by name.
pub trait BlobStore {
    fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<(), DeployError>;
    fn read_blob(&self, key: &str) -> Result<Vec<u8>, DeployError>;
}

/// Blob storage in a directory, one file per key.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl BlobStore for FileBlobStore {
    fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<(), DeployError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), "Wrote blob");
        Ok(())
    }

    fn read_blob(&self, key: &str) -> Result<Vec<u8>, DeployError> {
        Ok(std::fs::read(self.path_for(key))?)
    }
}

/// Persist a snapshot under `key`.
pub fn save_snapshot(
    store: &dyn BlobStore,
    key: &str,
    snapshot: &AddressSnapshot,
) -> Result<(), DeployError> {
    store.write_blob(key, &snapshot.to_json()?)
}

pub fn load_snapshot(store: &dyn BlobStore, key: &str) -> Result<AddressSnapshot, DeployError> {
    AddressSnapshot::from_json(&store.read_blob(key)?)
}
