//! Leading + trailing throttle as an explicit state machine
//!
//! The first call in an idle window fires immediately. Calls arriving before
//! the window elapses are merged into one pending payload, which fires once
//! when the window ends. Firing a trailing payload opens a new window.
//!
//! The machine owns no timer: `call` tells the caller when a timer is needed
//! and the caller invokes `fire` at the deadline.

use crate::contract::Snapshot;
use std::time::Duration;
use tokio::time::Instant;

/// Payloads that can be coalesced; `newer` wins on conflict
pub trait Merge {
    fn merge(&mut self, newer: Self);
}

impl Merge for Snapshot {
    fn merge(&mut self, newer: Self) {
        self.extend(newer);
    }
}

#[derive(Debug)]
enum State<P> {
    Idle,
    /// A payload fired; nothing pending until `deadline`
    Cooling { deadline: Instant },
    /// Payload waiting for the trailing edge at `deadline`
    Pending { payload: P, deadline: Instant },
}

/// Result of `Throttle::call`
#[derive(Debug, PartialEq)]
pub enum CallOutcome<P> {
    /// Apply the payload now
    Fire(P),
    /// The payload was merged into the pending one; when `schedule` is true a
    /// timer for `deadline` must be started
    Deferred { deadline: Instant, schedule: bool },
}

#[derive(Debug)]
pub struct Throttle<P> {
    window: Duration,
    state: State<P>,
}

impl<P: Merge> Throttle<P> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: State::Idle,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending { .. })
    }

    pub fn call(&mut self, payload: P, now: Instant) -> CallOutcome<P> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => self.fire_leading(payload, now),
            State::Cooling { deadline } if now >= deadline => self.fire_leading(payload, now),
            State::Cooling { deadline } => {
                self.state = State::Pending { payload, deadline };
                CallOutcome::Deferred {
                    deadline,
                    schedule: true,
                }
            }
            State::Pending {
                payload: mut pending,
                deadline,
            } => {
                pending.merge(payload);
                self.state = State::Pending {
                    payload: pending,
                    deadline,
                };
                CallOutcome::Deferred {
                    deadline,
                    schedule: false,
                }
            }
        }
    }

    /// Trailing edge; returns the payload to apply, if any
    pub fn fire(&mut self, now: Instant) -> Option<P> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Pending { payload, .. } => {
                self.state = State::Cooling {
                    deadline: now + self.window,
                };
                Some(payload)
            }
            State::Cooling { deadline } if now < deadline => {
                self.state = State::Cooling { deadline };
                None
            }
            State::Cooling { .. } | State::Idle => None,
        }
    }

    /// Take the pending payload now, keeping the current window
    pub fn take_pending(&mut self, now: Instant) -> Option<P> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Pending { payload, deadline } => {
                self.state = State::Cooling {
                    deadline: deadline.max(now),
                };
                Some(payload)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    fn fire_leading(&mut self, payload: P, now: Instant) -> CallOutcome<P> {
        self.state = State::Cooling {
            deadline: now + self.window,
        };
        CallOutcome::Fire(payload)
    }
}
