//! Downstream relay connections: consumers that receive a full-state
//! bootstrap on attach and every subsequent session message verbatim.

use log::warn;
use thiserror::Error;

/// The relay transport failed to deliver; the connection is considered
/// dead and is unregistered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("relay connection failed to send reliable message")]
pub struct RelaySendError;

/// Reliable-delivery capability of one downstream consumer.
pub trait RelayConnection {
    fn send_reliable(&mut self, message: &[u8]) -> Result<(), RelaySendError>;
}

pub type RelayId = u64;

/// The set of attached relay connections.
pub(crate) struct RelaySet {
    next_id: RelayId,
    connections: Vec<(RelayId, Box<dyn RelayConnection>)>,
}

impl RelaySet {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            connections: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn attach(&mut self, connection: Box<dyn RelayConnection>) -> RelayId {
        let id = self.next_id;
        self.next_id += 1;
        self.connections.push((id, connection));
        id
    }

    pub fn detach(&mut self, id: RelayId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|(conn_id, _)| *conn_id != id);
        self.connections.len() != before
    }

    /// Sends to every attached connection, dropping any that fail.
    pub fn broadcast(&mut self, message: &[u8]) {
        self.connections.retain_mut(|(id, connection)| {
            match connection.send_reliable(message) {
                Ok(()) => true,
                Err(_) => {
                    warn!("dropping relay connection {id}: send failed");
                    false
                }
            }
        });
    }

    pub fn clear(&mut self) {
        self.connections.clear();
    }
}
