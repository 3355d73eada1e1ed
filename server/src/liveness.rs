use crate::client_manager::{ClientId, ClientManager, Outbound};
use log::{debug, info};
use std::time::{Duration, Instant};

/// Probes quiet sessions and evicts the ones that never answered
///
/// Each sweep handles a session in one of two ways:
/// - a session still waiting for the pong of the previous probe is terminated
/// - a session idle for longer than `ping_timeout` is probed and marked pending
#[derive(Debug, Clone, Copy)]
pub struct LivenessMonitor {
    ping_timeout: Duration,
}

impl LivenessMonitor {
    pub fn new(ping_timeout: Duration) -> Self {
        Self { ping_timeout }
    }

    /// Runs one sweep and returns the sessions removed from the registry.
    pub fn sweep(&self, clients: &mut ClientManager, now: Instant) -> Vec<ClientId> {
        let mut terminated = Vec::new();

        clients.for_each_open(|client| {
            if !client.alive {
                terminated.push(client.id);
                return;
            }

            if client.is_idle(now, self.ping_timeout) {
                debug!("Probing client {}", client.id);
                client.push(Outbound::Ping);
                client.alive = false;
                client.last_message = now;
            }
        });

        for client_id in &terminated {
            info!("Client {} did not answer probe, terminating", client_id);
            if let Some(client) = clients.get(client_id) {
                client.push(Outbound::Terminate);
            }
            clients.remove_client(client_id);
        }

        terminated
    }
}
