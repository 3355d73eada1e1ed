//! Fan-out of encoded events to sessions

use crate::client_manager::{Client, ClientManager, Outbound};
use log::debug;
use shared::{encode, Event};
use std::time::Instant;

/// Sends one event to a single session. Returns false if the session is closed.
pub fn send_to(client: &mut Client, event: &Event, now: Instant) -> bool {
    send_encoded(client, encode(event), now)
}

/// Sends one event to every open session and returns how many were reached.
pub fn broadcast(clients: &mut ClientManager, event: &Event, now: Instant) -> usize {
    let frame = encode(event);
    let mut reached = 0;

    clients.for_each_open(|client| {
        if send_encoded(client, frame.clone(), now) {
            reached += 1;
        }
    });

    reached
}

fn send_encoded(client: &mut Client, frame: Vec<u8>, now: Instant) -> bool {
    if !client.is_open() {
        return false;
    }

    if client.push(Outbound::Frame(frame)) {
        client.last_message = now;
        true
    } else {
        debug!("Dropped frame for closed client {}", client.id);
        false
    }
}
