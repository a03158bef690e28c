//! The pipeline of upcoming events and the log of completed ones.

use std::collections::VecDeque;

use nightcourt_common::EventName;

use crate::event::Event;
use crate::mixins::{ChoiceState, VoteState};

/// Upcoming events, consumed one at a time by the scheduler.
#[derive(Default)]
pub struct EventQueue {
    data: VecDeque<Box<dyn Event>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Box<dyn Event>) {
        self.data.push_back(event);
    }

    pub fn pop(&mut self) -> Option<Box<dyn Event>> {
        self.data.pop_front()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

/// Append-only log of completed events, searched by (name, iteration).
///
/// Lookups are capability tests: an entry only matches when it actually
/// carries the requested ballot or choice state.
#[derive(Default)]
pub struct EventHistory {
    data: Vec<Box<dyn Event>>,
}

impl EventHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Box<dyn Event>) {
        self.data.push(event);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn find_choice(&self, name: EventName, iteration: u32) -> Option<&ChoiceState> {
        self.data
            .iter()
            .filter(|e| e.name() == name && e.iteration() == iteration)
            .find_map(|e| e.as_choice())
    }

    pub fn find_vote(&self, name: EventName, iteration: u32) -> Option<&VoteState> {
        self.data
            .iter()
            .filter(|e| e.name() == name && e.iteration() == iteration)
            .find_map(|e| e.as_vote())
    }
}
