//! Plugin discovery and instantiation.
//!
//! A plugin is a `*.plugin.json` manifest naming a species and the behavior
//! template it binds to. Its parameters come from the species document under
//! the same name. Plugins are discovered once at startup; a broken manifest
//! is logged and skipped, while an unreadable directory aborts the load.

use crate::entity::Entity;
use crate::registry::SpeciesRegistry;
use savanna_core::{
    BehaviorTemplate, ConfigurationSection, Error, Position, Result, SpeciesConfig,
    SpeciesDescriptor, SpeciesDocument,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Manifest ABI this engine understands
pub const PLUGIN_API_VERSION: u32 = 1;
/// File name suffix marking a plugin manifest
pub const MANIFEST_SUFFIX: &str = ".plugin.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    pub name: String,
    pub behavior: BehaviorTemplate,
    pub api_version: u32,
}

impl PluginManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// An instantiated plugin species
#[derive(Debug, Clone)]
pub struct SpeciesPlugin {
    manifest: PluginManifest,
    config: SpeciesConfig,
    descriptor: Arc<SpeciesDescriptor>,
}

impl SpeciesPlugin {
    /// Bind a manifest to its record in the species document
    pub fn instantiate(manifest: PluginManifest, document: &SpeciesDocument) -> Result<Self> {
        let config = document.species(&manifest.name)?.clone();
        let descriptor = SpeciesDescriptor::from_config(&config, manifest.behavior)?;

        Ok(Self {
            manifest,
            config,
            descriptor: Arc::new(descriptor),
        })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn symbol(&self) -> char {
        self.descriptor.symbol
    }

    pub fn version(&self) -> &str {
        &self.config.plugin.version
    }

    pub fn configuration(&self) -> &ConfigurationSection {
        &self.config.configuration
    }

    pub fn is_compatible(&self) -> bool {
        self.manifest.api_version == PLUGIN_API_VERSION
    }

    pub fn descriptor(&self) -> &Arc<SpeciesDescriptor> {
        &self.descriptor
    }

    pub fn create_entity(&self, position: Position) -> Entity {
        Entity::new(Arc::clone(&self.descriptor), position)
    }
}

/// Outcome of one directory scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Species names registered by this call
    pub registered: Vec<String>,
    /// Manifests that failed, with the reason
    pub skipped: Vec<(String, String)>,
}

pub struct PluginLoader {
    plugin_dir: PathBuf,
    loaded: HashSet<String>,
}

impl PluginLoader {
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            loaded: HashSet::new(),
        }
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// Manifest paths in the plugin directory, sorted by file name
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let access = |source| Error::DirectoryAccess {
            path: self.plugin_dir.display().to_string(),
            source,
        };

        let mut manifests = Vec::new();
        for entry in fs::read_dir(&self.plugin_dir).map_err(access)? {
            let path = entry.map_err(access)?.path();
            let is_manifest = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.ends_with(MANIFEST_SUFFIX));
            if is_manifest && path.is_file() {
                manifests.push(path);
            }
        }
        manifests.sort();

        debug!(
            plugin_dir = %self.plugin_dir.display(),
            found = manifests.len(),
            "Discovered plugin manifests"
        );
        Ok(manifests)
    }

    /// Scan the directory and register every compatible plugin.
    ///
    /// Manifests already loaded by this loader are skipped silently.
    #[instrument(skip(self, document, registry), fields(plugin_dir = %self.plugin_dir.display()))]
    pub fn load(
        &mut self,
        document: &SpeciesDocument,
        registry: &mut SpeciesRegistry,
    ) -> Result<LoadReport> {
        info!(event = "plugin_scan", "Searching for plugins");

        let mut report = LoadReport::default();
        for path in self.discover()? {
            let key = manifest_key(&path);
            if self.loaded.contains(&key) {
                continue;
            }

            match load_one(&path, document) {
                Ok(plugin) => {
                    info!(
                        event = "plugin_loaded",
                        plugin = %plugin.name(),
                        symbol = %plugin.symbol(),
                        version = %plugin.version(),
                        "Plugin registered"
                    );
                    report.registered.push(plugin.name().to_string());
                    registry.register(plugin.descriptor().as_ref().clone());
                    self.loaded.insert(key);
                }
                Err(err) => {
                    warn!(
                        event = "plugin_skipped",
                        manifest = %path.display(),
                        error = %err,
                        "Skipping plugin"
                    );
                    report.skipped.push((key, err.to_string()));
                }
            }
        }

        info!(
            event = "plugin_scan_complete",
            registered = report.registered.len(),
            skipped = report.skipped.len(),
            "Plugin loading finished"
        );
        Ok(report)
    }
}

fn manifest_key(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(MANIFEST_SUFFIX).to_string())
        .unwrap_or_default()
}

fn load_one(path: &Path, document: &SpeciesDocument) -> Result<SpeciesPlugin> {
    let key = manifest_key(path);
    let plugin_error = |reason: String| Error::PluginLoad {
        plugin: key.clone(),
        reason,
    };

    let manifest = PluginManifest::load(path).map_err(|e| plugin_error(e.to_string()))?;
    let plugin =
        SpeciesPlugin::instantiate(manifest, document).map_err(|e| plugin_error(e.to_string()))?;

    if !plugin.is_compatible() {
        return Err(plugin_error(format!(
            "incompatible api version {} (expected {})",
            plugin.manifest.api_version, PLUGIN_API_VERSION
        )));
    }
    Ok(plugin)
}
