//! Vote collection, plurality resolution and win conditions.
//!
//! Everything here is a pure function of its inputs so that the outcome of a
//! ballot can be replayed from the recorded votes alone.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::entities::{PlayerId, Roster};
use super::errors::{SessionError, SessionResult};

/// Result of tallying one ballot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VoteOutcome {
    /// A unique maximum exists.
    Eliminate(PlayerId),
    /// Two or more players share the maximum, sorted by id.
    Tie(Vec<PlayerId>),
    NoVotes,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Defenders,
    Impostor,
}

/// One voting cycle: who may vote, who may be voted on, and the votes so far.
#[derive(Clone, Debug)]
pub struct Ballot {
    voters: BTreeSet<PlayerId>,
    candidates: BTreeSet<PlayerId>,
    votes: HashMap<PlayerId, PlayerId>,
}

impl Ballot {
    pub fn new(
        voters: impl IntoIterator<Item = PlayerId>,
        candidates: impl IntoIterator<Item = PlayerId>,
    ) -> Self {
        Self {
            voters: voters.into_iter().collect(),
            candidates: candidates.into_iter().collect(),
            votes: HashMap::new(),
        }
    }

    /// Records a vote, replacing any earlier vote by the same voter.
    /// Returns the replaced target, if any.
    pub fn cast(&mut self, voter: PlayerId, target: PlayerId) -> SessionResult<Option<PlayerId>> {
        if !self.voters.contains(&voter) {
            return Err(SessionError::NotAVoter(voter));
        }
        if voter == target {
            return Err(SessionError::CannotVoteOnSelf);
        }
        if !self.candidates.contains(&target) {
            return Err(SessionError::InvalidVoteTarget(target));
        }
        Ok(self.votes.insert(voter, target))
    }

    pub fn is_complete(&self) -> bool {
        self.voters.iter().all(|v| self.votes.contains_key(v))
    }

    pub fn pending(&self) -> Vec<PlayerId> {
        self.voters
            .iter()
            .filter(|v| !self.votes.contains_key(v))
            .copied()
            .collect()
    }

    pub fn candidates(&self) -> Vec<PlayerId> {
        self.candidates.iter().copied().collect()
    }

    pub fn votes(&self) -> &HashMap<PlayerId, PlayerId> {
        &self.votes
    }

    /// Voters whose current vote is on `target`.
    pub fn voters_for(&self, target: PlayerId) -> Vec<PlayerId> {
        let mut voters: Vec<_> = self
            .votes
            .iter()
            .filter(|&(_, t)| *t == target)
            .map(|(v, _)| *v)
            .collect();
        voters.sort_unstable();
        voters
    }
}

/// Counts votes per target.
pub fn tally(votes: &HashMap<PlayerId, PlayerId>) -> BTreeMap<PlayerId, u32> {
    let mut counts = BTreeMap::new();
    for target in votes.values() {
        *counts.entry(*target).or_insert(0) += 1;
    }
    counts
}

/// Simple plurality over a tally.
pub fn resolve(counts: &BTreeMap<PlayerId, u32>) -> VoteOutcome {
    let Some(max) = counts.values().copied().max() else {
        return VoteOutcome::NoVotes;
    };
    let leaders: Vec<PlayerId> = counts
        .iter()
        .filter(|&(_, c)| *c == max)
        .map(|(id, _)| *id)
        .collect();
    match leaders.as_slice() {
        [single] => VoteOutcome::Eliminate(*single),
        _ => VoteOutcome::Tie(leaders),
    }
}

/// Win condition as a function of roster composition alone.
///
/// Defenders win once the impostor is eliminated. The impostor wins while
/// alive with at most one alive defender left.
pub fn check_winner(roster: &Roster) -> Option<Winner> {
    let impostor = roster.impostor()?;
    if !impostor.alive {
        return Some(Winner::Defenders);
    }
    let alive_defenders = roster.alive().filter(|p| !p.is_impostor()).count();
    if alive_defenders <= 1 {
        return Some(Winner::Impostor);
    }
    None
}
