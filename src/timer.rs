//! Cancellable timers for the voice loop
//!
//! Timers never call back into the coordinator directly. Scheduling a timer
//! eventually delivers `LoopEvent::Timer(id)` to the loop, and the owning
//! `TimerSlot` decides whether that expiry is still current. Cancelling or
//! re-arming a slot bumps its generation so stale expiries are ignored.

use crate::events::{EventSender, LoopEvent};
use std::thread;
use std::time::Duration;
use tracing::trace;

/// What a timer is for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// No recognition activity for the silence timeout
    Silence,
    /// Delay before recognition restarts
    Restart,
}

/// Identifies one arming of a timer slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId {
    pub kind: TimerKind,
    pub generation: u64,
}

/// Something that can deliver `LoopEvent::Timer` after a delay
pub trait Timers: Send {
    fn schedule(&mut self, id: TimerId, after: Duration);
}

/// A single logical timer that can be armed, re-armed and cancelled
#[derive(Debug)]
pub struct TimerSlot {
    kind: TimerKind,
    generation: u64,
    armed: bool,
}

impl TimerSlot {
    pub fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            generation: 0,
            armed: false,
        }
    }

    /// Arm the slot, replacing any pending expiry
    pub fn arm(&mut self, timers: &mut dyn Timers, after: Duration) -> TimerId {
        self.generation += 1;
        self.armed = true;
        let id = TimerId {
            kind: self.kind,
            generation: self.generation,
        };
        timers.schedule(id, after);
        id
    }

    /// Forget any pending expiry
    pub fn cancel(&mut self) {
        if self.armed {
            self.generation += 1;
            self.armed = false;
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Consume an expiry. Returns true only for the current arming.
    pub fn fire(&mut self, id: TimerId) -> bool {
        if self.armed && id.kind == self.kind && id.generation == self.generation {
            self.armed = false;
            true
        } else {
            false
        }
    }
}

/// Timers backed by sleeping threads
pub struct ThreadTimers {
    event_tx: EventSender,
}

impl ThreadTimers {
    pub fn new(event_tx: EventSender) -> Self {
        Self { event_tx }
    }
}

impl Timers for ThreadTimers {
    fn schedule(&mut self, id: TimerId, after: Duration) {
        let event_tx = self.event_tx.clone();
        thread::spawn(move || {
            thread::sleep(after);
            trace!("Timer {:?} elapsed", id);
            // The loop may already be gone at shutdown
            let _ = event_tx.send(LoopEvent::Timer(id));
        });
    }
}
