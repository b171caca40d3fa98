//! Species descriptors: the immutable data every entity of a species shares.
//!
//! Species differ only in data and in which behavior template they bind to.
//! Built-in species are defined here; plugin species are built from the
//! species document with [`SpeciesDescriptor::from_config`].

use crate::config::SpeciesConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Health every species starts with and is capped at
pub const DEFAULT_MAX_HEALTH: f64 = 20.0;
/// Floor health; dead entities sit here
pub const MIN_HEALTH: f64 = 0.0;
/// Health at or below this kills the entity
pub const DEATH_THRESHOLD: f64 = 0.1;
/// Wander attempts when a species does not configure its own
pub const DEFAULT_MOVEMENT_ATTEMPTS: u32 = 8;

pub const ANTELOPE_SYMBOL: char = 'A';
pub const LION_SYMBOL: char = 'L';
pub const ZEBRA_SYMBOL: char = 'Z';

/// Statically linked behavior a species binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorTemplate {
    /// Flee threats, otherwise wander
    Prey,
    /// Chase and catch prey, otherwise stay near mates or wander
    Predator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HuntingParams {
    /// Symbols this species hunts; never contains its own symbol
    pub prey: Vec<char>,
    pub catch_distance: f64,
    /// Health gained per catch
    pub prey_value: f64,
    /// Health spent per catch
    pub hunt_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Behavior {
    Prey,
    Predator(HuntingParams),
}

impl Behavior {
    pub fn template(&self) -> BehaviorTemplate {
        match self {
            Behavior::Prey => BehaviorTemplate::Prey,
            Behavior::Predator(_) => BehaviorTemplate::Predator,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementParams {
    pub movement_cost: f64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReproductionParams {
    pub required_rounds: u32,
    pub minimum_health: f64,
    pub mating_distance: f64,
    pub cost: f64,
}

impl Default for ReproductionParams {
    fn default() -> Self {
        Self {
            required_rounds: 3,
            minimum_health: 10.0,
            mating_distance: 2.0,
            cost: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthParams {
    pub initial: f64,
    pub max: f64,
}

impl Default for HealthParams {
    fn default() -> Self {
        Self {
            initial: DEFAULT_MAX_HEALTH,
            max: DEFAULT_MAX_HEALTH,
        }
    }
}

/// Where a descriptor came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpeciesOrigin {
    BuiltIn,
    Plugin { version: String },
}

/// Immutable description of one kind of entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDescriptor {
    pub name: String,
    pub symbol: char,
    pub speed: i32,
    pub vision_range: i32,
    pub movement: MovementParams,
    pub reproduction: ReproductionParams,
    pub health: HealthParams,
    pub behavior: Behavior,
    pub origin: SpeciesOrigin,
}

impl SpeciesDescriptor {
    /// Fast prey with short vision
    pub fn antelope() -> Self {
        Self {
            name: "Antelope".to_string(),
            symbol: ANTELOPE_SYMBOL,
            speed: 2,
            vision_range: 4,
            movement: MovementParams {
                movement_cost: 0.5,
                max_attempts: DEFAULT_MOVEMENT_ATTEMPTS,
            },
            reproduction: ReproductionParams::default(),
            health: HealthParams::default(),
            behavior: Behavior::Prey,
            origin: SpeciesOrigin::BuiltIn,
        }
    }

    /// Slow predator with longer vision
    pub fn lion() -> Self {
        Self {
            name: "Lion".to_string(),
            symbol: LION_SYMBOL,
            speed: 1,
            vision_range: 5,
            movement: MovementParams {
                movement_cost: 0.5,
                max_attempts: DEFAULT_MOVEMENT_ATTEMPTS,
            },
            reproduction: ReproductionParams::default(),
            health: HealthParams::default(),
            behavior: Behavior::Predator(HuntingParams {
                prey: vec![ANTELOPE_SYMBOL, ZEBRA_SYMBOL],
                catch_distance: 1.0,
                prey_value: 10.0,
                hunt_cost: 0.0,
            }),
            origin: SpeciesOrigin::BuiltIn,
        }
    }

    pub fn builtins() -> Vec<Self> {
        vec![Self::antelope(), Self::lion()]
    }

    /// Build a plugin species from its configuration record
    pub fn from_config(config: &SpeciesConfig, template: BehaviorTemplate) -> Result<Self> {
        let symbol = config.symbol()?;

        let behavior = match template {
            BehaviorTemplate::Prey => Behavior::Prey,
            BehaviorTemplate::Predator => {
                let hunting = config.hunting.as_ref().ok_or_else(|| {
                    Error::Configuration(format!(
                        "predator species '{}' has no hunting section",
                        config.plugin.name
                    ))
                })?;
                Behavior::Predator(HuntingParams {
                    prey: config.prey_symbols()?,
                    catch_distance: hunting.hunting_range,
                    prey_value: hunting.hunting_damage,
                    hunt_cost: hunting.hunting_cost,
                })
            }
        };

        let max_attempts = match config.movement.max_movement_attempts {
            0 => DEFAULT_MOVEMENT_ATTEMPTS,
            n => n,
        };

        Ok(Self {
            name: config.plugin.name.clone(),
            symbol,
            speed: config.configuration.speed,
            vision_range: config.configuration.vision_range,
            movement: MovementParams {
                movement_cost: config.movement.movement_cost,
                max_attempts,
            },
            reproduction: ReproductionParams {
                required_rounds: config.reproduction.required_consecutive_rounds,
                minimum_health: config.reproduction.minimum_health_to_reproduce,
                mating_distance: config.reproduction.mating_distance,
                cost: config.reproduction.reproduction_cost,
            },
            health: HealthParams::default(),
            behavior,
            origin: SpeciesOrigin::Plugin {
                version: config.plugin.version.clone(),
            },
        })
    }

    pub fn hunting(&self) -> Option<&HuntingParams> {
        match &self.behavior {
            Behavior::Predator(hunting) => Some(hunting),
            Behavior::Prey => None,
        }
    }

    /// Whether this species hunts entities with `symbol`
    pub fn hunts(&self, symbol: char) -> bool {
        self.hunting()
            .map(|h| h.prey.contains(&symbol))
            .unwrap_or(false)
    }

    pub fn version(&self) -> Option<&str> {
        match &self.origin {
            SpeciesOrigin::Plugin { version } => Some(version),
            SpeciesOrigin::BuiltIn => None,
        }
    }
}
