//! Compiled contract artifacts (ABI + creation bytecode).
//!
//! Reads Hardhat output (`artifacts/**/<Name>.sol/<Name>.json`, `bytecode`
//! as a hex string) and Foundry output (`out/<Name>.sol/<Name>.json`,
//! `bytecode.object`). Interface-only ABIs for contracts deployed elsewhere
//! (tokens, DEX routers) can be registered from human-readable signatures.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use alloy::json_abi::JsonAbi;
use alloy::primitives::Bytes;
use tracing::debug;

use crate::error::DeployError;

#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub abi: JsonAbi,
    /// Creation bytecode. Empty for interface-only artifacts.
    pub bytecode: Bytes,
}

impl Artifact {
    /// Parse a Hardhat or Foundry artifact JSON document.
    pub fn from_json(name: &str, content: &str) -> Result<Self, DeployError> {
        let json: serde_json::Value = serde_json::from_str(content)?;

        let abi: JsonAbi = serde_json::from_value(json["abi"].clone())
            .map_err(|e| DeployError::ArtifactError(format!("{name}: invalid abi: {e}")))?;

        let bytecode_hex = json["bytecode"]
            .as_str()
            .or_else(|| json["bytecode"]["object"].as_str())
            .unwrap_or("0x");
        let stripped = bytecode_hex.strip_prefix("0x").unwrap_or(bytecode_hex);
        let bytecode = hex::decode(stripped)
            .map_err(|e| DeployError::ArtifactError(format!("{name}: invalid bytecode hex: {e}")))?;

        Ok(Self {
            name: name.to_string(),
            abi,
            bytecode: Bytes::from(bytecode),
        })
    }

    /// Build an artifact from human-readable signatures, e.g.
    /// `"function balanceOf(address owner) view returns (uint256)"`.
    pub fn from_signatures(
        name: &str,
        signatures: &[&str],
        bytecode: Bytes,
    ) -> Result<Self, DeployError> {
        let abi = JsonAbi::parse(signatures.iter().copied())
            .map_err(|e| DeployError::ArtifactError(format!("{name}: invalid signature: {e}")))?;
        Ok(Self {
            name: name.to_string(),
            abi,
            bytecode,
        })
    }

    pub fn is_deployable(&self) -> bool {
        !self.bytecode.is_empty()
    }
}

/// Lazily loading, caching artifact lookup.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    roots: Vec<PathBuf>,
    cache: RwLock<HashMap<String, Arc<Artifact>>>,
}

impl ArtifactStore {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Register an artifact directly, replacing any cached one of the same name.
    pub fn insert(&self, artifact: Artifact) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.insert(artifact.name.clone(), Arc::new(artifact));
    }

    pub fn contains(&self, name: &str) -> bool {
        let cached = self
            .cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name);
        cached || self.locate(name).is_some()
    }

    pub fn load(&self, name: &str) -> Result<Arc<Artifact>, DeployError> {
        if let Some(artifact) = self.cache.read().unwrap_or_else(|e| e.into_inner()).get(name) {
            return Ok(Arc::clone(artifact));
        }

        let path = self.locate(name).ok_or_else(|| {
            DeployError::ArtifactError(format!(
                "Cannot find artifact for {name} under {:?}. Compile the contracts first.",
                self.roots
            ))
        })?;
        debug!(artifact = name, path = %path.display(), "Loading artifact");

        let content = std::fs::read_to_string(&path)?;
        let artifact = Arc::new(Artifact::from_json(name, &content)?);
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), Arc::clone(&artifact));
        Ok(artifact)
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        let file_dir = format!("{name}.sol");
        let file_name = format!("{name}.json");
        self.roots.iter().find_map(|root| {
            let direct = root.join(&file_dir).join(&file_name);
            if direct.is_file() {
                Some(direct)
            } else {
                find_nested(root, &file_dir, &file_name)
            }
        })
    }
}

/// Depth-first search for `<dir_name>/<file_name>` below `root`.
fn find_nested(root: &Path, dir_name: &str, file_name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if path.file_name().is_some_and(|n| n == dir_name) {
            let candidate = path.join(file_name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if let Some(found) = find_nested(&path, dir_name, file_name) {
            return Some(found);
        }
    }
    None
}
