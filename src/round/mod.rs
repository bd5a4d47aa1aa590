//! Round/phase state machine and the selection pools it draws from
//!
//! The controller is synchronous. Every operation returns the [`Effect`]s the
//! caller must carry out: events to publish and timers to start or cancel.
//! [`crate::session`] runs those effects on tokio.

mod controller;
mod phase;
mod pools;

pub use controller::{RoundController, SPIN_FRAMES};
pub use phase::{Phase, RoundState, Spin};
pub use pools::SelectionPools;

use crate::protocol::GameEvent;
use crate::types::TimerKind;

/// Side effect requested by the round controller
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Emit(GameEvent),
    /// Start a timer, replacing any running timer of the same kind
    StartTimer(TimerKind),
    CancelTimer(TimerKind),
}
