//! Event queue: a stack, not a FIFO.
//!
//! Reactions to a broadcast event (Signal from Market, Order from Signal,
//! Fill from Order) are pushed onto the same structure that holds the
//! remaining market history. Popping from the top therefore drains a causal
//! cascade depth-first before the next independent event is reached.
//! Turning this into a FIFO changes simulation results.
//!
//! Market events that share a timestamp are popped together as one unit of
//! work, so every instrument observed at the same instant is broadcast before
//! any reaction to any of them.

use crate::domain::{Event, EventError};
use std::collections::VecDeque;

#[derive(Debug, Default, Clone)]
pub struct EventQueue {
    // Top of the stack is the back.
    stack: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an event on top. Invalid orders and fills are rejected here and
    /// never queued.
    pub fn push(&mut self, event: Event) -> Result<(), EventError> {
        event.validate()?;
        self.stack.push_back(event);
        Ok(())
    }

    /// Pop the next unit of work.
    ///
    /// A non-market event comes back alone. A market event comes back with
    /// every market event directly beneath it carrying the identical
    /// timestamp. An empty queue yields an empty vector.
    pub fn pop_unit_of_work(&mut self) -> Vec<Event> {
        let Some(first) = self.stack.pop_back() else {
            return Vec::new();
        };

        if !first.is_market() {
            return vec![first];
        }
        let ts = first.timestamp();

        let mut unit = vec![first];
        while let Some(next) = self.stack.pop_back() {
            if next.is_market() && next.timestamp() == ts {
                unit.push(next);
            } else {
                self.stack.push_back(next);
                break;
            }
        }
        unit
    }

    /// Bulk-load market history. Events are ordered by (timestamp, symbol)
    /// and pushed in reverse, so the earliest pops first and simultaneous
    /// events pop in symbol order.
    pub fn extend_chronological<I>(&mut self, events: I) -> Result<usize, EventError>
    where
        I: IntoIterator<Item = Event>,
    {
        let mut batch: Vec<Event> = events.into_iter().collect();
        for event in &batch {
            event.validate()?;
        }
        batch.sort_by(|a, b| {
            a.timestamp()
                .cmp(&b.timestamp())
                .then_with(|| a.symbol().cmp(b.symbol()))
        });
        let count = batch.len();
        self.stack.extend(batch.into_iter().rev());
        Ok(count)
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn size(&self) -> usize {
        self.stack.len()
    }

    /// The event that would be popped next, if any.
    #[cfg(test)]
    pub fn peek(&self) -> Option<&Event> {
        self.stack.back()
    }
}
