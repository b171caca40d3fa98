//! Symbol to species lookup.

use savanna_core::{SpeciesDescriptor, SpeciesOrigin};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Display row for a loaded plugin species
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub symbol: char,
    pub version: String,
}

/// Species known to a field, keyed by display symbol
#[derive(Debug, Clone, Default)]
pub struct SpeciesRegistry {
    species: BTreeMap<char, Arc<SpeciesDescriptor>>,
}

impl SpeciesRegistry {
    /// Registry holding the built-in species
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for descriptor in SpeciesDescriptor::builtins() {
            registry.register(descriptor);
        }
        registry
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a species. A later registration for the same symbol replaces
    /// the earlier one; the replaced descriptor is returned.
    pub fn register(&mut self, descriptor: SpeciesDescriptor) -> Option<Arc<SpeciesDescriptor>> {
        let symbol = descriptor.symbol;
        let name = descriptor.name.clone();
        let previous = self.species.insert(symbol, Arc::new(descriptor));

        match &previous {
            Some(old) => warn!(
                event = "species_symbol_collision",
                symbol = %symbol,
                replaced = %old.name,
                species = %name,
                "Species symbol already registered, replacing"
            ),
            None => info!(
                event = "species_registered",
                symbol = %symbol,
                species = %name,
                "Registered species"
            ),
        }

        previous
    }

    pub fn resolve(&self, symbol: char) -> Option<Arc<SpeciesDescriptor>> {
        self.species.get(&symbol).cloned()
    }

    pub fn contains(&self, symbol: char) -> bool {
        self.species.contains_key(&symbol)
    }

    /// All species in symbol order
    pub fn all(&self) -> impl Iterator<Item = &Arc<SpeciesDescriptor>> + '_ {
        self.species.values()
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn available_symbols(&self) -> Vec<char> {
        self.species.keys().copied().collect()
    }

    pub fn plugin_info(&self) -> Vec<PluginInfo> {
        self.species
            .values()
            .filter_map(|descriptor| match &descriptor.origin {
                SpeciesOrigin::Plugin { version } => Some(PluginInfo {
                    name: descriptor.name.clone(),
                    symbol: descriptor.symbol,
                    version: version.clone(),
                }),
                SpeciesOrigin::BuiltIn => None,
            })
            .collect()
    }

    /// Whether a plugin species with this name is registered
    pub fn contains_plugin(&self, name: &str) -> bool {
        self.species.values().any(|descriptor| {
            descriptor.name == name && matches!(descriptor.origin, SpeciesOrigin::Plugin { .. })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use savanna_core::{ANTELOPE_SYMBOL, LION_SYMBOL};

    fn plugin_species(name: &str, symbol: char) -> SpeciesDescriptor {
        let mut descriptor = SpeciesDescriptor::antelope();
        descriptor.name = name.to_string();
        descriptor.symbol = symbol;
        descriptor.origin = SpeciesOrigin::Plugin {
            version: "1.0.0".to_string(),
        };
        descriptor
    }

    #[test]
    fn test_builtins_registered() {
        let registry = SpeciesRegistry::new();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.available_symbols(), vec![ANTELOPE_SYMBOL, LION_SYMBOL]);
        assert!(registry.plugin_info().is_empty());
        assert!(registry.resolve('Q').is_none());
    }

    #[test]
    fn test_later_registration_wins() {
        let mut registry = SpeciesRegistry::new();
        let previous = registry.register(plugin_species("Impala", ANTELOPE_SYMBOL));

        assert_eq!(previous.map(|p| p.name.clone()), Some("Antelope".to_string()));
        assert_eq!(registry.resolve(ANTELOPE_SYMBOL).map(|s| s.name.clone()), Some("Impala".to_string()));
        assert_eq!(registry.len(), 2);

        // same order again yields the same result
        let mut again = SpeciesRegistry::new();
        again.register(plugin_species("Impala", ANTELOPE_SYMBOL));
        assert_eq!(
            again.resolve(ANTELOPE_SYMBOL).map(|s| s.name.clone()),
            registry.resolve(ANTELOPE_SYMBOL).map(|s| s.name.clone())
        );
    }

    #[test]
    fn test_plugin_info() {
        let mut registry = SpeciesRegistry::new();
        registry.register(plugin_species("Zebra", 'Z'));

        assert!(registry.contains_plugin("Zebra"));
        assert!(!registry.contains_plugin("Lion"));
        assert_eq!(
            registry.plugin_info(),
            vec![PluginInfo {
                name: "Zebra".to_string(),
                symbol: 'Z',
                version: "1.0.0".to_string(),
            }]
        );
    }
}
