use crate::config::Config;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Target, MIN_CLICKABLE_SIDE, TARGET_ID_SPACE};
use std::collections::BTreeMap;

/// Authoritative set of live targets
///
/// Targets are keyed by id, so hit tests always scan in ascending id order and
/// an id collision from the random generator simply replaces the older entry.
#[derive(Debug, Clone)]
pub struct GameState {
    targets: BTreeMap<u16, Target>,
    max_targets: usize,
    min_width: u16,
    min_height: u16,
    size_variance: u16,
    field_width: u16,
    field_height: u16,
    rng: StdRng,
}

impl GameState {
    pub fn new(config: &Config) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: &Config, rng: StdRng) -> Self {
        Self {
            targets: BTreeMap::new(),
            max_targets: config.max_targets,
            min_width: config.min_width.max(MIN_CLICKABLE_SIDE),
            min_height: config.min_height.max(MIN_CLICKABLE_SIDE),
            size_variance: config.size_variance,
            field_width: config.field_width,
            field_height: config.field_height,
            rng,
        }
    }

    /// Creates one random target, or does nothing when the board is full.
    pub fn spawn_target(&mut self) -> Option<Target> {
        if self.targets.len() >= self.max_targets {
            return None;
        }

        let target = Target {
            id: self.rng.gen_range(0..TARGET_ID_SPACE),
            x: self.rng.gen_range(0..self.field_width.max(1)),
            y: self.rng.gen_range(0..self.field_height.max(1)),
            width: self
                .min_width
                .saturating_add(self.rng.gen_range(0..=self.size_variance)),
            height: self
                .min_height
                .saturating_add(self.rng.gen_range(0..=self.size_variance)),
        };

        if self.targets.insert(target.id, target).is_some() {
            debug!("Target id {} reused, replacing previous target", target.id);
        }

        Some(target)
    }

    /// Spawns until the board is full and returns everything created.
    pub fn fill(&mut self) -> Vec<Target> {
        let mut spawned = Vec::new();
        // Id collisions replace instead of adding, so cap the attempts.
        for _ in 0..self.max_targets * 4 {
            match self.spawn_target() {
                Some(target) => spawned.push(target),
                None => break,
            }
        }
        info!("Seeded board with {} targets", self.targets.len());
        spawned
    }

    /// Places a target directly, replacing any live target with the same id.
    pub fn insert(&mut self, target: Target) {
        self.targets.insert(target.id, target);
    }

    /// Finds the first target strictly containing the point and removes it.
    ///
    /// Lookup and removal happen in one call so two clicks can never both
    /// claim the same target.
    pub fn hit_test(&mut self, x: u16, y: u16) -> Option<Target> {
        let id = self
            .targets
            .values()
            .find(|target| target.contains(x, y))
            .map(|target| target.id)?;

        self.targets.remove(&id)
    }

    pub fn snapshot(&self) -> Vec<Target> {
        self.targets.values().copied().collect()
    }

    pub fn get(&self, id: u16) -> Option<&Target> {
        self.targets.get(&id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.targets.len() >= self.max_targets
    }
}
