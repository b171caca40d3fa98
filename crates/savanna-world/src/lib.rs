//! Simulation engine.
//!
//! The bounded field where predators and prey move, hunt and reproduce, plus
//! the species registry and plugin loader that feed it.

pub mod behavior;
pub mod entity;
pub mod field;
pub mod plugin;
pub mod registry;
pub mod reproduction;
pub mod session;

pub use behavior::MoveOutcome;
pub use entity::{Entity, EntitySnapshot};
pub use field::{Bounds, Field, FieldStats};
pub use plugin::{LoadReport, PluginLoader, PluginManifest, SpeciesPlugin, PLUGIN_API_VERSION};
pub use registry::{PluginInfo, SpeciesRegistry};
pub use reproduction::ReproductionState;
pub use session::{SessionRegistry, SharedField};
