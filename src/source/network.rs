//! A live feeder backed by a channel. Transport code pushes complete
//! session message envelopes from its own thread; the session drains them
//! on its tick.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::error::SessionError;
use crate::source::{FeedState, SourceFeeder, UnderrunPolicy};

/// The sending half handed to transport code. Cheap to clone; the feeder
/// ends when every sender is dropped.
#[derive(Clone)]
pub struct MessageSender {
    tx: Sender<Vec<u8>>,
}

impl MessageSender {
    /// Queues one session message. Returns `false` if the feeder has been
    /// dropped.
    pub fn send(&self, message: Vec<u8>) -> bool {
        self.tx.send(message).is_ok()
    }
}

/// Receiving half, polled by the session. Never blocks.
pub struct NetworkFeeder {
    rx: Receiver<Vec<u8>>,
    policy: UnderrunPolicy,
}

impl NetworkFeeder {
    /// Creates a connected sender/feeder pair. Live streams usually want
    /// [`UnderrunPolicy::SkipAhead`] so a stall catches back up instead of
    /// drifting ever further behind the peer.
    pub fn channel(policy: UnderrunPolicy) -> (MessageSender, NetworkFeeder) {
        let (tx, rx) = mpsc::channel();
        (MessageSender { tx }, NetworkFeeder { rx, policy })
    }
}

impl SourceFeeder for NetworkFeeder {
    fn next_message(&mut self) -> Result<FeedState, SessionError> {
        match self.rx.try_recv() {
            Ok(message) => Ok(FeedState::Message(message)),
            Err(TryRecvError::Empty) => Ok(FeedState::Idle),
            Err(TryRecvError::Disconnected) => Ok(FeedState::EndOfStream),
        }
    }

    fn underrun_policy(&self) -> UnderrunPolicy {
        self.policy
    }
}
