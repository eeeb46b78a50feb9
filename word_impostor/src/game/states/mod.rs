//! Phase state definitions for the session FSM.
//!
//! Each state carries only the data that is meaningful while the session is
//! in that phase. Round data is dropped when the phase is left.

use enum_dispatch::enum_dispatch;

use crate::game::{
    entities::{Clue, Phase, PlayerId},
    scoring::EndReason,
    voting::Ballot,
};

/// Read-only queries every phase answers.
#[enum_dispatch]
pub trait PhaseBehavior {
    fn phase(&self) -> Phase;

    /// Player expected to give the next clue, if clues are being collected.
    fn turn_holder(&self) -> Option<PlayerId> {
        None
    }

    /// Players who have not voted yet, if a ballot is open.
    fn pending_voters(&self) -> Vec<PlayerId> {
        vec![]
    }

    /// Players who may currently be voted on.
    fn candidates(&self) -> Vec<PlayerId> {
        vec![]
    }
}

/// Lobby state - players join and leave until someone starts the game
#[derive(Debug, Default)]
pub struct Lobby {}

/// What happened to a submitted clue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClueStep {
    /// Not the submitter's turn, or no clue expected.
    Ignored,
    /// Accepted; `0` is up next.
    Next(PlayerId),
    /// Accepted and every expected player has now given a clue.
    Complete,
}

/// Clue collection in a fixed turn order
#[derive(Debug, Clone)]
pub struct ClueRound {
    order: Vec<PlayerId>,
    cursor: usize,
    clues: Vec<Clue>,
}

impl ClueRound {
    pub fn new(order: Vec<PlayerId>) -> Self {
        Self {
            order,
            cursor: 0,
            clues: vec![],
        }
    }

    pub fn current(&self) -> Option<PlayerId> {
        self.order.get(self.cursor).copied()
    }

    pub fn clues(&self) -> &[Clue] {
        &self.clues
    }

    pub fn order(&self) -> &[PlayerId] {
        &self.order
    }

    pub fn accept(&mut self, player: PlayerId, text: String) -> ClueStep {
        if self.current() != Some(player) {
            return ClueStep::Ignored;
        }
        self.clues.push(Clue { player, text });
        self.cursor += 1;
        match self.current() {
            Some(next) => ClueStep::Next(next),
            None => ClueStep::Complete,
        }
    }
}

impl PhaseBehavior for ClueRound {
    fn phase(&self) -> Phase {
        Phase::ClueRound
    }

    fn turn_holder(&self) -> Option<PlayerId> {
        self.current()
    }
}

/// Regular vote over all alive players
#[derive(Debug, Clone)]
pub struct Voting {
    pub ballot: Ballot,
}

impl PhaseBehavior for Voting {
    fn phase(&self) -> Phase {
        Phase::Voting
    }

    fn pending_voters(&self) -> Vec<PlayerId> {
        self.ballot.pending()
    }

    fn candidates(&self) -> Vec<PlayerId> {
        self.ballot.candidates()
    }
}

#[derive(Debug, Clone)]
pub enum TiebreakStage {
    Clues(ClueRound),
    Voting(Ballot),
}

/// Extra clue-and-vote cycle restricted to the players tied on top
#[derive(Debug, Clone)]
pub struct Tiebreak {
    pub candidates: Vec<PlayerId>,
    pub stage: TiebreakStage,
}

impl PhaseBehavior for Tiebreak {
    fn phase(&self) -> Phase {
        Phase::Tiebreak
    }

    fn turn_holder(&self) -> Option<PlayerId> {
        match &self.stage {
            TiebreakStage::Clues(round) => round.current(),
            TiebreakStage::Voting(_) => None,
        }
    }

    fn pending_voters(&self) -> Vec<PlayerId> {
        match &self.stage {
            TiebreakStage::Clues(_) => vec![],
            TiebreakStage::Voting(ballot) => ballot.pending(),
        }
    }

    fn candidates(&self) -> Vec<PlayerId> {
        self.candidates.clone()
    }
}

/// Final state; the session only waits to be unregistered
#[derive(Debug, Clone)]
pub struct Terminated {
    pub reason: EndReason,
}

impl PhaseBehavior for Lobby {
    fn phase(&self) -> Phase {
        Phase::Lobby
    }
}

impl PhaseBehavior for Terminated {
    fn phase(&self) -> Phase {
        Phase::Terminated
    }
}

#[enum_dispatch(PhaseBehavior)]
#[derive(Debug)]
pub enum PhaseState {
    Lobby,
    ClueRound,
    Voting,
    Tiebreak,
    Terminated,
}

impl Default for PhaseState {
    fn default() -> Self {
        Lobby::default().into()
    }
}
