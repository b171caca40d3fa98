//! The bounded field: entity store, spatial queries and the tick loop.

use crate::behavior;
use crate::entity::{Entity, EntitySnapshot};
use crate::registry::SpeciesRegistry;
use crate::reproduction;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use savanna_core::{EntityId, Error, FieldConfig, Position, Result, SpeciesDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, event, info, instrument, warn, Level};

/// Tries to find an empty cell for a randomly placed entity
const RANDOM_PLACEMENT_ATTEMPTS: usize = 10;

/// Field dimensions; valid cells are `[0, width) x [0, height)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    pub fn clamp(&self, pos: Position) -> Position {
        pos.clamped(self.width, self.height)
    }

    /// Maximum number of living entities
    pub fn capacity(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

/// Counters and population breakdown for one field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub tick: u64,
    /// Living entities per species symbol
    pub population: BTreeMap<char, usize>,
    pub births: u64,
    pub deaths: u64,
    pub catches: u64,
}

impl FieldStats {
    pub fn total_population(&self) -> usize {
        self.population.values().sum()
    }
}

pub struct Field {
    bounds: Bounds,
    registry: Arc<SpeciesRegistry>,
    entities: Vec<Entity>,
    rng: ChaCha8Rng,
    tick: u64,
    metrics_interval: u64,
    births: u64,
    deaths: u64,
    catches: u64,
}

impl Field {
    pub fn new(config: &FieldConfig, registry: Arc<SpeciesRegistry>) -> Result<Self> {
        if config.width <= 0 || config.height <= 0 {
            return Err(Error::Configuration(format!(
                "field dimensions must be positive, got {}x{}",
                config.width, config.height
            )));
        }

        Ok(Self {
            bounds: Bounds::new(config.width, config.height),
            registry,
            entities: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            tick: 0,
            metrics_interval: config.metrics_interval,
            births: 0,
            deaths: 0,
            catches: 0,
        })
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn registry(&self) -> &Arc<SpeciesRegistry> {
        &self.registry
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Every stored entity, including dead ones not yet purged
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Add an entity of the species registered under `symbol`.
    ///
    /// The position is clamped into bounds. Returns `Ok(None)` when the field
    /// is at capacity.
    pub fn add_entity(&mut self, symbol: char, position: Position) -> Result<Option<EntityId>> {
        let species = self
            .registry
            .resolve(symbol)
            .ok_or(Error::UnknownSpecies(symbol))?;
        Ok(self.insert(species, position))
    }

    /// Add an entity on a random empty cell. Gives up with `Ok(None)` when
    /// no empty cell turns up within a few attempts.
    pub fn add_entity_randomly(&mut self, symbol: char) -> Result<Option<EntityId>> {
        let species = self
            .registry
            .resolve(symbol)
            .ok_or(Error::UnknownSpecies(symbol))?;

        for _ in 0..RANDOM_PLACEMENT_ATTEMPTS {
            let candidate = Position::new(
                self.rng.gen_range(0..self.bounds.width),
                self.rng.gen_range(0..self.bounds.height),
            );
            if self.entities_at(candidate).is_empty() {
                return Ok(self.insert(species, candidate));
            }
        }

        warn!(
            event = "placement_failed",
            symbol = %symbol,
            "Could not find an empty cell for new entity"
        );
        Ok(None)
    }

    fn insert(&mut self, species: Arc<SpeciesDescriptor>, position: Position) -> Option<EntityId> {
        if self.is_at_capacity() {
            debug!(
                event = "capacity_reached",
                symbol = %species.symbol,
                capacity = self.bounds.capacity(),
                "Field full, entity not added"
            );
            return None;
        }

        let entity = Entity::new(species, self.bounds.clamp(position));
        let id = entity.id;
        self.entities.push(entity);
        Some(id)
    }

    pub fn is_valid_position(&self, pos: Position) -> bool {
        self.bounds.contains(pos)
    }

    pub fn clamp_position(&self, pos: Position) -> Position {
        self.bounds.clamp(pos)
    }

    pub fn living_count(&self) -> usize {
        self.entities.iter().filter(|e| e.is_alive()).count()
    }

    pub fn is_at_capacity(&self) -> bool {
        self.living_count() >= self.bounds.capacity()
    }

    /// Living entities on exactly `pos`
    pub fn entities_at(&self, pos: Position) -> Vec<&Entity> {
        self.entities
            .iter()
            .filter(|e| e.is_alive() && e.position == pos)
            .collect()
    }

    /// Living entities within `radius` of `center` (inclusive)
    pub fn entities_in_range(&self, center: Position, radius: f64) -> Vec<&Entity> {
        self.entities
            .iter()
            .filter(|e| e.is_alive() && e.position.distance_to(&center) <= radius)
            .collect()
    }

    pub fn entities_of_species_in_range(
        &self,
        center: Position,
        radius: f64,
        symbol: char,
    ) -> Vec<&Entity> {
        self.entities_in_range(center, radius)
            .into_iter()
            .filter(|e| e.symbol() == symbol)
            .collect()
    }

    pub fn entities_snapshot(&self) -> Vec<EntitySnapshot> {
        self.entities.iter().map(EntitySnapshot::from).collect()
    }

    pub fn stats(&self) -> FieldStats {
        let mut population = BTreeMap::new();
        for entity in self.entities.iter().filter(|e| e.is_alive()) {
            *population.entry(entity.symbol()).or_insert(0) += 1;
        }

        FieldStats {
            tick: self.tick,
            population,
            births: self.births,
            deaths: self.deaths,
            catches: self.catches,
        }
    }

    /// Advance the field by one tick.
    ///
    /// Entities act in collection order and see each other's changes
    /// immediately. Offspring born during the tick act from the next tick on.
    #[instrument(level = "trace", skip(self), fields(tick = self.tick + 1))]
    pub fn update(&mut self) {
        self.tick += 1;

        self.purge_dead();
        self.enforce_capacity();

        let acting = self.entities.len();
        for index in 0..acting {
            if !self.entities[index].is_alive() {
                continue;
            }
            self.move_entity(index);
            self.act(index);
            self.entities[index].tick();
        }

        if self.metrics_interval > 0 && self.tick % self.metrics_interval == 0 {
            self.emit_population_metrics();
        }
    }

    fn purge_dead(&mut self) {
        let before = self.entities.len();
        self.entities.retain(|e| e.is_alive());
        let removed = before - self.entities.len();
        if removed > 0 {
            debug!(event = "dead_purged", tick = self.tick, removed = removed, "Purged dead entities");
        }
    }

    /// Keep the healthiest `capacity` entities, ties broken by collection order
    fn enforce_capacity(&mut self) {
        let capacity = self.bounds.capacity();
        let len = self.entities.len();
        if len <= capacity {
            return;
        }

        let mut ranked: Vec<usize> = (0..len).collect();
        ranked.sort_by(|&a, &b| {
            self.entities[b]
                .health()
                .total_cmp(&self.entities[a].health())
        });

        let mut keep = vec![false; len];
        for &index in ranked.iter().take(capacity) {
            keep[index] = true;
        }
        let mut flags = keep.into_iter();
        self.entities.retain(|_| flags.next().unwrap_or(false));

        warn!(
            event = "capacity_trimmed",
            tick = self.tick,
            capacity = capacity,
            dropped = len - capacity,
            "Population over capacity, dropped weakest entities"
        );
    }

    fn move_entity(&mut self, index: usize) {
        let outcome = behavior::plan_move(&self.entities, index, self.bounds, &mut self.rng);

        if let Some(prey) = outcome.caught {
            self.apply_catch(index, prey);
        }

        let entity = &mut self.entities[index];
        entity.move_to(outcome.destination);
        let cost = entity.species().movement.movement_cost;
        entity.decrease_health(cost);

        if !entity.is_alive() {
            self.deaths += 1;
            debug!(
                event = "entity_starved",
                tick = self.tick,
                entity_id = %entity.id,
                symbol = %entity.symbol(),
                "Entity died of exhaustion"
            );
        }
    }

    fn apply_catch(&mut self, hunter: usize, prey: usize) {
        if !self.entities[prey].is_alive() {
            return;
        }

        self.entities[prey].die();
        self.deaths += 1;
        self.catches += 1;

        let prey_id = self.entities[prey].id;
        let prey_symbol = self.entities[prey].symbol();

        let entity = &mut self.entities[hunter];
        if let Some(hunting) = entity.species().hunting().cloned() {
            entity.increase_health(hunting.prey_value);
            entity.decrease_health(hunting.hunt_cost);
        }

        debug!(
            event = "prey_caught",
            tick = self.tick,
            hunter_id = %entity.id,
            hunter = %entity.symbol(),
            prey_id = %prey_id,
            prey = %prey_symbol,
            health = entity.health(),
            "Predator caught prey"
        );
    }

    fn act(&mut self, index: usize) {
        let mate = reproduction::find_mate(&self.entities, index);

        let entity = &mut self.entities[index];
        entity.advance_streak(mate.is_some());
        if !entity.can_reproduce() {
            return;
        }
        let Some(mate) = mate else {
            return;
        };

        let parent = self.entities[index].position;
        if !reproduction::is_creator(parent, self.entities[mate].position) {
            return;
        }

        let species = Arc::clone(self.entities[index].species());
        let position = reproduction::offspring_position(parent, self.bounds, &mut self.rng);
        let Some(child) = self.insert(Arc::clone(&species), position) else {
            return;
        };

        self.births += 1;
        let entity = &mut self.entities[index];
        entity.record_offspring();
        entity.decrease_health(species.reproduction.cost);

        debug!(
            event = "offspring_born",
            tick = self.tick,
            parent_id = %entity.id,
            offspring_id = %child,
            symbol = %species.symbol,
            position = %position,
            parent_health = entity.health(),
            "Offspring born"
        );

        if !entity.is_alive() {
            self.deaths += 1;
            debug!(
                event = "parent_exhausted",
                tick = self.tick,
                entity_id = %entity.id,
                symbol = %entity.symbol(),
                "Entity died paying reproduction cost"
            );
        }
    }

    fn emit_population_metrics(&self) {
        let stats = self.stats();
        let living: Vec<&Entity> = self.entities.iter().filter(|e| e.is_alive()).collect();
        let avg_health = if living.is_empty() {
            0.0
        } else {
            living.iter().map(|e| e.health()).sum::<f64>() / living.len() as f64
        };
        let max_age = living.iter().map(|e| e.age()).max().unwrap_or(0);

        info!(
            event = "population_metrics",
            tick = self.tick,
            total_population = stats.total_population(),
            population = ?stats.population,
            births = stats.births,
            deaths = stats.deaths,
            catches = stats.catches,
            avg_health = avg_health,
            max_age = max_age,
            "Population metrics snapshot"
        );

        for (symbol, count) in &stats.population {
            event!(
                Level::INFO,
                gauge_name = "population_by_species",
                gauge_value = *count,
                symbol = %symbol,
                tick = self.tick,
                "Population gauge"
            );
        }

        event!(
            Level::INFO,
            gauge_name = "avg_health",
            gauge_value = avg_health,
            tick = self.tick,
            "Average health"
        );
    }
}
