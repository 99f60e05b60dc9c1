//! Sources of framed session messages: a replay file or a live network
//! peer. The interpreter pulls from a feeder only when its ready queue
//! runs dry, so a slow source produces an underrun instead of blocking.

pub mod network;
pub mod replay;

use crate::error::SessionError;

/// One pull from a feeder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
    /// A complete session message envelope.
    Message(Vec<u8>),
    /// Nothing available right now; more may arrive later.
    Idle,
    /// The source is exhausted and will never produce again.
    EndOfStream,
}

/// What the session does when the ready queue empties before the target
/// time is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnderrunPolicy {
    /// Hold at the current time and wait for more data (replay files).
    Pause,
    /// Proceed anyway and skip ahead once data comes in (live relays,
    /// where the source itself regulates pacing).
    SkipAhead,
}

pub trait SourceFeeder {
    /// Pulls the next session message. Errors here are fatal to the
    /// session; a benign end of data is [`FeedState::EndOfStream`].
    fn next_message(&mut self) -> Result<FeedState, SessionError>;

    fn underrun_policy(&self) -> UnderrunPolicy;

    /// Rescales the caller's time advance (replay speed control).
    fn scale_time_advance(&mut self, advance: u32) -> u32 {
        advance
    }

    /// Notification that the session reset. With `rewind` set the source
    /// should restart from the beginning (replay files reopen and
    /// revalidate their header).
    fn on_session_reset(&mut self, rewind: bool) -> Result<(), SessionError> {
        let _ = rewind;
        Ok(())
    }
}

/// A feeder that never produces anything, for sessions fed by pushing
/// envelopes directly into [`crate::Session::handle_session_message`].
pub struct IdleSource;

impl SourceFeeder for IdleSource {
    fn next_message(&mut self) -> Result<FeedState, SessionError> {
        Ok(FeedState::Idle)
    }

    fn underrun_policy(&self) -> UnderrunPolicy {
        UnderrunPolicy::SkipAhead
    }
}
