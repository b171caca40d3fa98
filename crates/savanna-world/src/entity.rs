//! Entity state and health management.

use savanna_core::{EntityId, Position, SpeciesDescriptor, DEATH_THRESHOLD, MIN_HEALTH};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An animal on the field
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub position: Position,
    species: Arc<SpeciesDescriptor>,
    health: f64,
    alive: bool,
    reproduction_streak: u32,
    age: u64,
    offspring_count: u32,
}

impl Entity {
    pub fn new(species: Arc<SpeciesDescriptor>, position: Position) -> Self {
        let health = species.health.initial.min(species.health.max);
        Self {
            id: EntityId::new(),
            position,
            species,
            health,
            alive: true,
            reproduction_streak: 0,
            age: 0,
            offspring_count: 0,
        }
    }

    pub fn species(&self) -> &Arc<SpeciesDescriptor> {
        &self.species
    }

    pub fn symbol(&self) -> char {
        self.species.symbol
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn max_health(&self) -> f64 {
        self.species.health.max
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn offspring_count(&self) -> u32 {
        self.offspring_count
    }

    pub fn reproduction_streak(&self) -> u32 {
        self.reproduction_streak
    }

    /// Lose health; dies once health reaches the death threshold
    pub fn decrease_health(&mut self, amount: f64) {
        if !self.alive {
            return;
        }

        self.health = (self.health - amount).clamp(MIN_HEALTH, self.max_health());
        if self.health <= DEATH_THRESHOLD {
            self.die();
        }
    }

    /// Gain health up to the species maximum; no effect when dead
    pub fn increase_health(&mut self, amount: f64) {
        if !self.alive {
            return;
        }

        self.health = (self.health + amount).clamp(MIN_HEALTH, self.max_health());
    }

    /// Irreversible
    pub fn die(&mut self) {
        self.alive = false;
        self.health = MIN_HEALTH;
        self.reproduction_streak = 0;
    }

    /// Advance the mating streak for this tick.
    ///
    /// Resets when dead, below the reproduction minimum, or with no mate nearby.
    pub fn advance_streak(&mut self, mate_nearby: bool) {
        let minimum = self.species.reproduction.minimum_health;
        if !self.alive || self.health < minimum || !mate_nearby {
            self.reproduction_streak = 0;
        } else {
            self.reproduction_streak = self.reproduction_streak.saturating_add(1);
        }
    }

    /// Derived every call from streak and current health
    pub fn can_reproduce(&self) -> bool {
        let params = &self.species.reproduction;
        self.alive
            && self.reproduction_streak >= params.required_rounds
            && self.health >= params.minimum_health
    }

    pub fn move_to(&mut self, new_position: Position) {
        if self.alive {
            self.position = new_position;
        }
    }

    pub fn tick(&mut self) {
        self.age += 1;
    }

    pub fn record_offspring(&mut self) {
        self.offspring_count += 1;
    }
}

/// Read-only view of an entity for external collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub position: Position,
    pub symbol: char,
    pub species: String,
    pub health: f64,
    pub alive: bool,
    pub age: u64,
    pub offspring_count: u32,
}

impl From<&Entity> for EntitySnapshot {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            position: entity.position,
            symbol: entity.symbol(),
            species: entity.species.name.clone(),
            health: entity.health,
            alive: entity.alive,
            age: entity.age,
            offspring_count: entity.offspring_count,
        }
    }
}
