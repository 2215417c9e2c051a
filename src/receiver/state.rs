//! Receiver state machine

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Receiver lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Created, thread not yet running
    Init,
    /// Fetching messages
    Running,
    /// Backing off after an empty fetch
    EmptyWait,
    /// Loop has exited; terminal
    Stopped,
}

impl ReceiverState {
    fn as_u8(self) -> u8 {
        match self {
            ReceiverState::Init => 0,
            ReceiverState::Running => 1,
            ReceiverState::EmptyWait => 2,
            ReceiverState::Stopped => 3,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => ReceiverState::Init,
            1 => ReceiverState::Running,
            2 => ReceiverState::EmptyWait,
            _ => ReceiverState::Stopped,
        }
    }
}

impl fmt::Display for ReceiverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReceiverState::Init => "init",
            ReceiverState::Running => "running",
            ReceiverState::EmptyWait => "empty-wait",
            ReceiverState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Receiver state shared between the loop thread and observers
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(ReceiverState::Init.as_u8()))
    }

    pub fn get(&self) -> ReceiverState {
        ReceiverState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next`, unless already stopped
    pub fn set(&self, next: ReceiverState) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                if ReceiverState::from_u8(cur) == ReceiverState::Stopped {
                    None
                } else {
                    Some(next.as_u8())
                }
            });
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
