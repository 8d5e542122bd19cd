//! Outbound calls deferred until the socket opens
//!
//! Calls made while the transport is still connecting are recorded here as
//! a method tag plus arguments. When the transport opens the connection
//! drains the queue once, in insertion order. Tags the connection does not
//! recognize are skipped.

use std::collections::VecDeque;

use roomlink_protocol::Value;

/// Method tag for a deferred frame write
pub const SEND: &str = "send";

/// A deferred invocation
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCall {
    pub method: String,
    pub args: Vec<Value>,
}

impl PendingCall {
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

#[derive(Debug, Default)]
pub struct CallQueue {
    calls: VecDeque<PendingCall>,
}

impl CallQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, method: impl Into<String>, args: Vec<Value>) {
        self.calls.push_back(PendingCall::new(method, args));
    }

    /// Removes every queued call, yielding them in insertion order
    ///
    /// The queue is empty as soon as this returns, so a call can never be
    /// yielded twice.
    pub fn drain(&mut self) -> std::collections::vec_deque::IntoIter<PendingCall> {
        std::mem::take(&mut self.calls).into_iter()
    }

    /// Discards every queued call, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.calls.len();
        self.calls.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
