use crate::config::SpawnPolicy;

/// Decides how many replacement spawns are due on each spawn-timer tick.
///
/// There is a single timer in the event loop; hits only change a counter here.
#[derive(Debug, Clone, Copy)]
pub struct SpawnScheduler {
    policy: SpawnPolicy,
    hits: u32,
}

impl SpawnScheduler {
    pub fn new(policy: SpawnPolicy) -> Self {
        Self { policy, hits: 0 }
    }

    /// Registers a hit
    pub fn arm(&mut self) {
        self.hits = self.hits.saturating_add(1);
    }

    pub fn is_armed(&self) -> bool {
        self.hits > 0
    }

    /// Spawn attempts to make on this tick
    pub fn due(&self) -> u32 {
        match self.policy {
            SpawnPolicy::Steady => u32::from(self.is_armed()),
            SpawnPolicy::Compounding => self.hits,
        }
    }
}
