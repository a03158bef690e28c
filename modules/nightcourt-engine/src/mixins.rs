//! The three orthogonal capabilities composed into concrete events.
//!
//! All three only accumulate, so the "everyone voted / everyone accepted"
//! predicates are monotone and the resulting status flip is idempotent no
//! matter how inbound actions interleave.

use std::collections::{HashMap, HashSet};

use crate::player::PlayerId;

/// One target picked by one role-holder.
#[derive(Debug, Default)]
pub struct ChoiceState {
    choice: Option<PlayerId>,
}

impl ChoiceState {
    pub fn set(&mut self, target: PlayerId) {
        self.choice = Some(target);
    }

    pub fn get(&self) -> Option<PlayerId> {
        self.choice
    }
}

/// A voter → target ballot. Re-votes overwrite (last write wins per voter).
#[derive(Debug, Default)]
pub struct VoteState {
    voted: HashMap<PlayerId, PlayerId>,
    candidate: Option<PlayerId>,
}

impl VoteState {
    pub fn record(&mut self, voter: PlayerId, target: PlayerId) {
        self.voted.insert(voter, target);
    }

    pub fn is_all_voted(&self, voters: &[PlayerId]) -> bool {
        voters.iter().all(|id| self.voted.contains_key(id))
    }

    pub fn votes(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.voted.values().copied()
    }

    /// The unique plurality winner. A tie or an empty ballot yields nothing
    /// and voids the round.
    pub fn tally(&self) -> Option<PlayerId> {
        let mut counts: HashMap<PlayerId, usize> = HashMap::new();
        for target in self.votes() {
            *counts.entry(target).or_insert(0) += 1;
        }

        let max = counts.values().copied().max()?;
        let mut leaders = counts.iter().filter(|(_, &count)| count == max);
        let (leader, _) = leaders.next()?;
        if leaders.next().is_some() {
            return None;
        }
        Some(*leader)
    }

    pub fn set_candidate(&mut self, target: PlayerId) {
        self.candidate = Some(target);
    }

    pub fn candidate(&self) -> Option<PlayerId> {
        self.candidate
    }
}

/// The set of players that have acknowledged a barrier.
#[derive(Debug, Default)]
pub struct AcceptState {
    accepted: HashSet<PlayerId>,
}

impl AcceptState {
    pub fn record(&mut self, player: PlayerId) {
        self.accepted.insert(player);
    }

    pub fn is_all_accepted(&self, players: &[PlayerId]) -> bool {
        players.iter().all(|id| self.accepted.contains(id))
    }
}
