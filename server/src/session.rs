//! Per-connection game logic
//!
//! `Arcade` owns the whole shared state: the live targets, the session
//! registry, the liveness monitor and the spawn scheduler. Every method is
//! synchronous and runs to completion on the event loop, so a hit test and
//! the removal of the hit target can never interleave with another click.

use crate::client_manager::{ClientId, ClientManager, Outbound};
use crate::config::Config;
use crate::dispatch::{broadcast, send_to};
use crate::game::GameState;
use crate::liveness::LivenessMonitor;
use crate::spawner::SpawnScheduler;
use log::{debug, info, warn};
use shared::{decode, Event, Target};
use std::time::Instant;
use tokio::sync::mpsc;

pub struct Arcade {
    game: GameState,
    clients: ClientManager,
    liveness: LivenessMonitor,
    spawner: SpawnScheduler,
}

impl Arcade {
    pub fn new(config: &Config) -> Self {
        Self::with_game(config, GameState::new(config))
    }

    pub fn with_game(config: &Config, game: GameState) -> Self {
        Self {
            game,
            clients: ClientManager::new(),
            liveness: LivenessMonitor::new(config.ping_timeout()),
            spawner: SpawnScheduler::new(config.spawn_policy),
        }
    }

    /// Fills the board before anyone connects
    pub fn seed(&mut self) -> usize {
        self.game.fill();
        self.game.len()
    }

    /// Registers a session, announces the new head count and replays the board
    pub fn connect(&mut self, sender: mpsc::UnboundedSender<Outbound>) -> ClientId {
        let client_id = self.clients.add_client(sender);
        self.broadcast_online_count();

        let now = Instant::now();
        let snapshot = self.game.snapshot();
        if let Some(client) = self.clients.get_mut(&client_id) {
            for target in snapshot {
                send_to(client, &Event::NewTarget(target), now);
            }
        }

        client_id
    }

    /// Handles one inbound binary frame
    pub fn handle_frame(&mut self, client_id: ClientId, frame: &[u8]) {
        self.clients.touch(&client_id, Instant::now());

        match decode(frame) {
            Ok(Event::Click { x, y }) => {
                self.click(client_id, x, y);
            }
            Ok(other) => {
                warn!(
                    "Client {} sent server-only event {:?}, ignoring",
                    client_id,
                    other.tag()
                );
            }
            Err(e) => {
                warn!("Discarding malformed frame from client {}: {}", client_id, e);
            }
        }
    }

    /// Resolves a click. On a hit, the clicker's score grows and everyone
    /// learns the target is gone.
    pub fn click(&mut self, client_id: ClientId, x: u16, y: u16) -> Option<Target> {
        debug!("Click from client {} at ({}, {})", client_id, x, y);

        if self.clients.get(&client_id).is_none() {
            debug!("Click from unknown client {}, ignoring", client_id);
            return None;
        }

        let Some(target) = self.game.hit_test(x, y) else {
            debug!("Client {} missed", client_id);
            return None;
        };

        let now = Instant::now();
        if let Some(score) = self.clients.record_hit(&client_id) {
            info!("Client {} hit target {} (score {})", client_id, target.id, score);
            if let Some(client) = self.clients.get_mut(&client_id) {
                send_to(client, &Event::Score { score }, now);
            }
        }

        broadcast(
            &mut self.clients,
            &Event::Hit {
                target_id: target.id,
            },
            now,
        );
        self.spawner.arm();

        Some(target)
    }

    pub fn pong(&mut self, client_id: ClientId) {
        debug!("Pong from client {}", client_id);
        self.clients.mark_alive(&client_id);
    }

    pub fn disconnect(&mut self, client_id: ClientId) {
        if self.clients.remove_client(&client_id) {
            self.broadcast_online_count();
        }
    }

    /// Runs one liveness sweep and returns the evicted sessions
    pub fn liveness_tick(&mut self, now: Instant) -> Vec<ClientId> {
        let terminated = self.liveness.sweep(&mut self.clients, now);
        if !terminated.is_empty() {
            self.broadcast_online_count();
        }
        terminated
    }

    /// Makes the spawn attempts due on this tick and announces each new target
    pub fn spawn_tick(&mut self) -> Vec<Target> {
        let mut spawned = Vec::new();

        for _ in 0..self.spawner.due() {
            match self.game.spawn_target() {
                Some(target) => spawned.push(target),
                None => break,
            }
        }

        let now = Instant::now();
        for target in &spawned {
            debug!("Spawned target {}", target.id);
            broadcast(&mut self.clients, &Event::NewTarget(*target), now);
        }

        spawned
    }

    pub fn online_count(&self) -> usize {
        self.clients.len()
    }

    pub fn score_of(&self, client_id: ClientId) -> Option<u16> {
        self.clients.get(&client_id).map(|client| client.score)
    }

    pub fn targets(&self) -> Vec<Target> {
        self.game.snapshot()
    }

    pub fn game_mut(&mut self) -> &mut GameState {
        &mut self.game
    }

    fn broadcast_online_count(&mut self) {
        let count = u16::try_from(self.clients.len()).unwrap_or(u16::MAX);
        broadcast(&mut self.clients, &Event::OnlineCount { count }, Instant::now());
    }
}
