//! Configuration types for the simulation.
//!
//! The species document is a JSON file of the form
//! `{"plugins": {"tiger": { "configuration": .., "movement": .., ... }}}`.
//! It is read once at startup and handed by reference to whatever builds
//! species descriptors; nothing here is global.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Identity section: symbol, speed and vision range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSection {
    pub symbol: String,
    pub speed: i32,
    pub vision_range: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementSection {
    pub movement_cost: f64,
    pub max_movement_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReproductionSection {
    pub required_consecutive_rounds: u32,
    pub minimum_health_to_reproduce: f64,
    pub mating_distance: f64,
    pub reproduction_cost: f64,
}

/// Present only for hunting species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuntingSection {
    pub prey_symbols: Vec<String>,
    /// Catch distance
    pub hunting_range: f64,
    /// Health gained from a catch
    pub hunting_damage: f64,
    #[serde(default)]
    pub hunting_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSection {
    pub name: String,
    pub version: String,
}

/// One species record of the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesConfig {
    pub configuration: ConfigurationSection,
    pub movement: MovementSection,
    pub reproduction: ReproductionSection,
    #[serde(default)]
    pub hunting: Option<HuntingSection>,
    pub plugin: PluginSection,
}

impl SpeciesConfig {
    /// The configured symbol as a single character
    pub fn symbol(&self) -> Result<char> {
        let mut chars = self.configuration.symbol.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::Configuration(format!(
                "species '{}' must declare exactly one symbol character, got \"{}\"",
                self.plugin.name, self.configuration.symbol
            ))),
        }
    }

    /// Prey symbols, excluding the species' own symbol
    pub fn prey_symbols(&self) -> Result<Vec<char>> {
        let own = self.symbol()?;
        let Some(hunting) = &self.hunting else {
            return Ok(Vec::new());
        };

        let mut prey = Vec::with_capacity(hunting.prey_symbols.len());
        for raw in &hunting.prey_symbols {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c == own => {
                    debug!(species = %self.plugin.name, "Dropping own symbol from prey list");
                }
                (Some(c), None) => {
                    if !prey.contains(&c) {
                        prey.push(c);
                    }
                }
                _ => {
                    return Err(Error::Configuration(format!(
                        "species '{}' has invalid prey symbol \"{}\"",
                        self.plugin.name, raw
                    )))
                }
            }
        }
        Ok(prey)
    }

    fn validate(&self, key: &str) -> Result<()> {
        self.symbol()?;
        self.prey_symbols()?;

        if self.configuration.speed < 0 || self.configuration.vision_range < 0 {
            return Err(Error::Configuration(format!(
                "species '{}' has negative speed or vision range",
                key
            )));
        }
        if self.reproduction.mating_distance < 0.0 || self.movement.movement_cost < 0.0 {
            return Err(Error::Configuration(format!(
                "species '{}' has negative mating distance or movement cost",
                key
            )));
        }
        Ok(())
    }
}

/// The whole species configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDocument {
    pub plugins: BTreeMap<String, SpeciesConfig>,
}

impl SpeciesDocument {
    /// Load and validate the document from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Configuration(format!(
                "species configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let document = Self::from_json(&content)?;

        info!(
            path = %path.display(),
            species = document.plugins.len(),
            "Loaded species configuration"
        );
        Ok(document)
    }

    /// Parse and validate a document from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let document: SpeciesDocument = serde_json::from_str(content)
            .map_err(|e| Error::Configuration(format!("failed to parse species document: {}", e)))?;

        if document.plugins.is_empty() {
            return Err(Error::Configuration(
                "species document contains no species entries".to_string(),
            ));
        }

        for (key, species) in &document.plugins {
            species.validate(key)?;
        }

        Ok(document)
    }

    /// Look up the record for a requested species name.
    ///
    /// The key may be the name itself or its lowercase form. The declared
    /// `plugin.name` must equal the requested name.
    pub fn species(&self, name: &str) -> Result<&SpeciesConfig> {
        let config = self
            .plugins
            .get(name)
            .or_else(|| self.plugins.get(&name.to_lowercase()))
            .ok_or_else(|| {
                Error::Configuration(format!("no configuration entry for species '{}'", name))
            })?;

        if config.plugin.name != name {
            return Err(Error::Configuration(format!(
                "plugin name in config file ({}) does not match expected name ({})",
                config.plugin.name, name
            )));
        }

        Ok(config)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.values().map(|c| c.plugin.name.as_str())
    }
}

/// Field configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Width of the field in cells
    pub width: i32,
    /// Height of the field in cells
    pub height: i32,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Ticks between population metric events (0 disables them)
    pub metrics_interval: u64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 10,
            seed: 0,
            metrics_interval: 100,
        }
    }
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub field: FieldConfig,
    /// Directory scanned for plugin manifests
    pub plugin_dir: PathBuf,
    /// Species configuration document
    pub species_config_path: PathBuf,
    /// Number of independent sessions to run
    pub sessions: usize,
    /// Ticks per session
    pub ticks: u64,
    /// Delay between ticks (milliseconds)
    pub tick_interval_ms: u64,
    /// Initial entities per registered species
    pub initial_per_species: usize,
    /// OpenTelemetry endpoint
    pub otel_endpoint: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            field: FieldConfig::default(),
            plugin_dir: PathBuf::from("./plugins"),
            species_config_path: PathBuf::from("./plugins/config.json"),
            sessions: 1,
            ticks: 200,
            tick_interval_ms: 500,
            initial_per_species: 4,
            otel_endpoint: None,
        }
    }
}

impl RunnerConfig {
    /// Defaults overlaid with `SAVANNA_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        fn parse<T: std::str::FromStr>(key: &str, value: String) -> Result<T> {
            value
                .parse()
                .map_err(|_| Error::Configuration(format!("invalid value for {}: {}", key, value)))
        }

        let mut config = Self::default();

        if let Some(v) = lookup("SAVANNA_WIDTH") {
            config.field.width = parse("SAVANNA_WIDTH", v)?;
        }
        if let Some(v) = lookup("SAVANNA_HEIGHT") {
            config.field.height = parse("SAVANNA_HEIGHT", v)?;
        }
        if let Some(v) = lookup("SAVANNA_SEED") {
            config.field.seed = parse("SAVANNA_SEED", v)?;
        }
        if let Some(v) = lookup("SAVANNA_PLUGIN_DIR") {
            config.plugin_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SAVANNA_SPECIES_CONFIG") {
            config.species_config_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SAVANNA_SESSIONS") {
            config.sessions = parse("SAVANNA_SESSIONS", v)?;
        }
        if let Some(v) = lookup("SAVANNA_TICKS") {
            config.ticks = parse("SAVANNA_TICKS", v)?;
        }
        if let Some(v) = lookup("SAVANNA_TICK_INTERVAL_MS") {
            config.tick_interval_ms = parse("SAVANNA_TICK_INTERVAL_MS", v)?;
        }
        if let Some(v) = lookup("SAVANNA_INITIAL_PER_SPECIES") {
            config.initial_per_species = parse("SAVANNA_INITIAL_PER_SPECIES", v)?;
        }
        config.otel_endpoint = lookup("OTEL_EXPORTER_OTLP_ENDPOINT");

        if config.field.width <= 0 || config.field.height <= 0 {
            return Err(Error::Configuration(format!(
                "field dimensions must be positive, got {}x{}",
                config.field.width, config.field.height
            )));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TIGER_DOC: &str = r#"{
        "plugins": {
            "tiger": {
                "configuration": { "symbol": "T", "speed": 2, "visionRange": 7 },
                "movement": { "movementCost": 1, "maxMovementAttempts": 10 },
                "reproduction": {
                    "requiredConsecutiveRounds": 3,
                    "minimumHealthToReproduce": 10.0,
                    "matingDistance": 2,
                    "reproductionCost": 5.0
                },
                "hunting": {
                    "preySymbols": ["Z", "A", "T"],
                    "huntingRange": 1.5,
                    "huntingDamage": 5.0,
                    "huntingCost": 0.0
                },
                "plugin": { "name": "Tiger", "version": "1.0.0" }
            }
        }
    }"#;

    #[test]
    fn test_parse_document() {
        let doc = SpeciesDocument::from_json(TIGER_DOC).unwrap();
        let tiger = doc.species("Tiger").unwrap();
        assert_eq!(tiger.symbol().unwrap(), 'T');
        assert_eq!(tiger.configuration.vision_range, 7);
        assert_eq!(tiger.reproduction.mating_distance, 2.0);
        // own symbol never ends up in the prey list
        assert_eq!(tiger.prey_symbols().unwrap(), vec!['Z', 'A']);
    }

    #[test]
    fn test_missing_species_names_request() {
        let doc = SpeciesDocument::from_json(TIGER_DOC).unwrap();
        let err = doc.species("Zebra").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("Zebra"));
    }

    #[test]
    fn test_name_mismatch() {
        let doc = SpeciesDocument::from_json(&TIGER_DOC.replace("\"Tiger\"", "\"Tigress\"")).unwrap();
        let err = doc.species("Tiger").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Tigress"));
        assert!(message.contains("Tiger"));
    }

    #[test]
    fn test_empty_and_malformed_documents() {
        assert!(matches!(
            SpeciesDocument::from_json(r#"{"plugins": {}}"#),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            SpeciesDocument::from_json("{ not json"),
            Err(Error::Configuration(_))
        ));
        // reproduction section is required
        let without_reproduction = r#"{"plugins": {"x": {
            "configuration": { "symbol": "X", "speed": 1, "visionRange": 1 },
            "movement": { "movementCost": 1, "maxMovementAttempts": 1 },
            "plugin": { "name": "X", "version": "0.1" }
        }}}"#;
        assert!(SpeciesDocument::from_json(without_reproduction).is_err());
    }

    #[test]
    fn test_multi_char_symbol_rejected() {
        let doc = TIGER_DOC.replace("\"symbol\": \"T\"", "\"symbol\": \"TG\"");
        assert!(matches!(
            SpeciesDocument::from_json(&doc),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = SpeciesDocument::load(Path::new("/definitely/not/here/config.json")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_runner_config_overrides() {
        let mut env = HashMap::new();
        env.insert("SAVANNA_WIDTH", "30".to_string());
        env.insert("SAVANNA_SESSIONS", "3".to_string());
        env.insert("SAVANNA_PLUGIN_DIR", "/opt/plugins".to_string());

        let config = RunnerConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.field.width, 30);
        assert_eq!(config.field.height, 10);
        assert_eq!(config.sessions, 3);
        assert_eq!(config.plugin_dir, PathBuf::from("/opt/plugins"));

        env.insert("SAVANNA_HEIGHT", "0".to_string());
        assert!(RunnerConfig::from_lookup(|k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn test_default_configs() {
        let field = FieldConfig::default();
        assert_eq!(field.width, 20);
        assert_eq!(field.height, 10);

        let runner = RunnerConfig::default();
        assert_eq!(runner.tick_interval_ms, 500);
    }
}
