//! Mating streaks and offspring placement.

use crate::entity::Entity;
use crate::field::Bounds;
use rand::Rng;
use savanna_core::Position;
use serde::{Deserialize, Serialize};

/// Where an entity sits in the reproduction cycle, derived from its streak and health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReproductionState {
    Idle,
    Approaching { streak: u32 },
    Eligible,
}

impl ReproductionState {
    pub fn of(entity: &Entity) -> Self {
        if entity.can_reproduce() {
            return ReproductionState::Eligible;
        }
        match entity.reproduction_streak() {
            0 => ReproductionState::Idle,
            streak => ReproductionState::Approaching { streak },
        }
    }
}

fn is_partner(me: &Entity, other: &Entity) -> bool {
    other.id != me.id && other.is_alive() && other.symbol() == me.symbol()
}

/// Any other living same-species entity within mating distance
pub fn mate_nearby(entities: &[Entity], index: usize) -> bool {
    find_mate(entities, index).is_some()
}

/// First living same-species partner within mating distance, in collection order
pub fn find_mate(entities: &[Entity], index: usize) -> Option<usize> {
    let me = &entities[index];
    let distance = me.species().reproduction.mating_distance;

    entities
        .iter()
        .position(|other| is_partner(me, other) && me.position.distance_to(&other.position) <= distance)
}

/// Only one entity of a pair gives birth: the one at or above-left of its mate
pub fn is_creator(me: Position, mate: Position) -> bool {
    me.x <= mate.x && me.y <= mate.y
}

/// Parent position jittered by `{-1, 0, 1}` per axis, clamped into bounds
pub fn offspring_position<R: Rng>(parent: Position, bounds: Bounds, rng: &mut R) -> Position {
    let dx = rng.gen_range(-1..=1);
    let dy = rng.gen_range(-1..=1);
    bounds.clamp(parent.add(dx, dy))
}
