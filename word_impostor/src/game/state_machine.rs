//! Session state machine for one chat.
//!
//! A `Session` is exclusively owned by its actor and is never shared. Every
//! operation either validates and mutates, or fails without mutating.

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;
use std::{collections::HashSet, sync::Arc};
use uuid::Uuid;

use super::{
    constants::EXCLAMATION_PREFIX,
    entities::{Assignment, ChatId, PairId, Phase, Player, PlayerId, Role, Roster, WordPair,
        sanitize_input},
    errors::{SessionError, SessionResult},
    events::EngineEvent,
    intents::{Content, DisplayIntent},
    scoring::{EndReason, GameResult, PlayerResult, player_outcome, score_deltas},
    settings::SessionSettings,
    states::{
        ClueRound, ClueStep, PhaseBehavior, PhaseState, Terminated, Tiebreak,
        TiebreakStage, Voting,
    },
    voting::{Ballot, VoteOutcome, Winner, check_winner, resolve, tally},
};
use crate::deck::{DeckError, WordBank};

/// Read-only view of a session for status rendering. Words are never included.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    pub chat_id: ChatId,
    pub phase: Phase,
    pub round: u32,
    pub players: Vec<PlayerSummary>,
    pub turn_holder: Option<PlayerId>,
    pub pending_voters: Vec<PlayerId>,
    pub candidates: Vec<PlayerId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub alive: bool,
}

#[derive(Debug)]
pub struct Session {
    game_id: Uuid,
    chat_id: ChatId,
    settings: SessionSettings,
    deck: Arc<WordBank>,
    /// Pairs used by this chat's recent games.
    excluded_pairs: HashSet<PairId>,
    roster: Roster,
    pair: Option<WordPair>,
    round: u32,
    state: PhaseState,
    rng: StdRng,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    /// Voters whose ballot eliminated the impostor.
    eliminating_voters: Vec<PlayerId>,
    intents: Vec<DisplayIntent>,
    /// Built on the transition to TERMINATED and taken exactly once.
    result: Option<GameResult>,
}

impl Session {
    pub fn new(
        chat_id: ChatId,
        settings: SessionSettings,
        deck: Arc<WordBank>,
        excluded_pairs: HashSet<PairId>,
    ) -> Self {
        Self::with_rng(
            chat_id,
            settings,
            deck,
            excluded_pairs,
            StdRng::from_rng(&mut rand::rng()),
        )
    }

    pub fn with_rng(
        chat_id: ChatId,
        settings: SessionSettings,
        deck: Arc<WordBank>,
        excluded_pairs: HashSet<PairId>,
        rng: StdRng,
    ) -> Self {
        Self {
            game_id: Uuid::new_v4(),
            chat_id,
            settings,
            deck,
            excluded_pairs,
            roster: Roster::new(),
            pair: None,
            round: 0,
            state: PhaseState::default(),
            rng,
            created_at: Utc::now(),
            started_at: None,
            eliminating_voters: vec![],
            intents: vec![],
            result: None,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[cfg(test)]
    pub(crate) fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn pair(&self) -> Option<&WordPair> {
        self.pair.as_ref()
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state, PhaseState::Terminated(_))
    }

    /// Hands out the final result. Returns `Some` at most once per session.
    pub fn take_result(&mut self) -> Option<GameResult> {
        self.result.take()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            chat_id: self.chat_id,
            phase: self.phase(),
            round: self.round,
            players: self
                .roster
                .iter()
                .map(|p| PlayerSummary {
                    id: p.id,
                    name: p.name.clone(),
                    alive: p.alive,
                })
                .collect(),
            turn_holder: self.state.turn_holder(),
            pending_voters: self.state.pending_voters(),
            candidates: self.state.candidates(),
            created_at: self.created_at,
        }
    }

    /// Applies one event and returns the display intents it produced.
    ///
    /// Player-facing failures are returned as errors and leave the session
    /// untouched. An invariant violation force-terminates the session; the
    /// intents describing that are returned as a normal outcome.
    pub fn handle(
        &mut self,
        player: PlayerId,
        event: EngineEvent,
    ) -> SessionResult<Vec<DisplayIntent>> {
        self.intents.clear();
        let outcome = match event {
            EngineEvent::Join { display_name } => self.join(player, &display_name),
            EngineEvent::Leave => self.leave(player),
            EngineEvent::Start => self.start(player),
            EngineEvent::Abort => self.abort(player),
            EngineEvent::SubmitClue { text } => self.submit_clue(player, &text),
            EngineEvent::SubmitGuess { text } => self.submit_guess(player, &text),
            EngineEvent::CastVote { target } => self.cast_vote(player, target),
            EngineEvent::RevealWordQuery => self.reveal_word(player),
        };

        match outcome {
            Ok(()) => Ok(std::mem::take(&mut self.intents)),
            Err(SessionError::InvariantViolation(detail)) => {
                log::error!(
                    "Chat {}: invariant violation in game {}: {}",
                    self.chat_id,
                    self.game_id,
                    detail
                );
                self.intents.clear();
                self.emit(Content::Error {
                    error: SessionError::InvariantViolation(detail),
                });
                self.force_terminate();
                Ok(std::mem::take(&mut self.intents))
            }
            Err(e) => {
                self.intents.clear();
                Err(e)
            }
        }
    }

    /// Ends the game without a winner, e.g. after an internal failure.
    pub fn force_terminate(&mut self) {
        if self.is_terminated() {
            return;
        }
        self.finish(None, EndReason::InternalError);
    }

    /// Tears the session down on behalf of the router. Returns the game-over
    /// intents, or nothing if the session had already terminated.
    pub fn close(&mut self) -> Vec<DisplayIntent> {
        self.intents.clear();
        if !self.is_terminated() {
            log::info!(
                "Chat {}: game {} closed during {}",
                self.chat_id,
                self.game_id,
                self.phase()
            );
            self.finish(None, EndReason::Closed);
        }
        std::mem::take(&mut self.intents)
    }

    /// Moves the session to the chat's new id after the platform upgraded
    /// the chat. Later intents and the game result carry `chat_id`.
    pub fn migrate(&mut self, chat_id: ChatId) {
        log::info!(
            "Chat {}: game {} migrated to chat {}",
            self.chat_id,
            self.game_id,
            chat_id
        );
        self.chat_id = chat_id;
    }

    pub fn join(&mut self, player: PlayerId, display_name: &str) -> SessionResult<()> {
        self.ensure_open()?;
        if !matches!(self.state, PhaseState::Lobby(_)) {
            return Err(SessionError::NotInLobby);
        }
        if self.roster.contains(player) {
            return Err(SessionError::AlreadyJoined);
        }
        if self.roster.len() >= self.settings.max_players {
            return Err(SessionError::RosterFull {
                max: self.settings.max_players,
            });
        }

        let player = Player::new(player, display_name);
        log::debug!("Chat {}: {} joined", self.chat_id, player);
        self.emit(Content::PlayerJoined {
            player: player.id,
            name: player.name.clone(),
            roster_size: self.roster.len() + 1,
        });
        self.roster.push(player);
        Ok(())
    }

    pub fn leave(&mut self, player: PlayerId) -> SessionResult<()> {
        self.ensure_open()?;
        if !matches!(self.state, PhaseState::Lobby(_)) {
            return Err(SessionError::NotInLobby);
        }
        if self.roster.remove(player).is_none() {
            return Err(SessionError::NotAPlayer(player));
        }
        self.emit(Content::PlayerLeft {
            player,
            roster_size: self.roster.len(),
        });
        Ok(())
    }

    pub fn start(&mut self, initiator: PlayerId) -> SessionResult<()> {
        self.ensure_open()?;
        if !matches!(self.state, PhaseState::Lobby(_)) {
            return Err(SessionError::AlreadyStarted);
        }
        let (min, max) = self.settings.roster_bounds();
        let current = self.roster.len();
        if current < min || current > max {
            return Err(SessionError::InsufficientPlayers { min, max, current });
        }

        let pair = self
            .deck
            .select_pair_with(
                &self.settings.deck_language,
                &self.settings.deck_id,
                &self.excluded_pairs,
                &mut self.rng,
            )
            .map_err(|e| match e {
                DeckError::NoEligiblePairs => SessionError::NoEligiblePairs,
                other => SessionError::DataUnavailable(other.to_string()),
            })?;

        log::debug!(
            "Chat {}: {} -> {}",
            self.chat_id,
            Phase::Lobby,
            Phase::RoleAssignment
        );
        self.assign_roles(&pair);
        self.pair = Some(pair);
        self.started_at = Some(Utc::now());

        log::info!(
            "Chat {}: game {} started by {} with {} players",
            self.chat_id,
            self.game_id,
            initiator,
            current
        );
        self.emit(Content::GameStarted {
            players: self.roster.iter().map(|p| p.id).collect(),
            language: self.settings.deck_language.clone(),
            deck_id: self.settings.deck_id.clone(),
        });
        self.begin_clue_round();
        Ok(())
    }

    pub fn abort(&mut self, requester: PlayerId) -> SessionResult<()> {
        self.ensure_open()?;
        let is_player = self.roster.contains(requester);
        if !self.settings.may_abort(requester, is_player) {
            return Err(SessionError::Unauthorized);
        }
        log::info!(
            "Chat {}: game {} aborted by {} during {}",
            self.chat_id,
            self.game_id,
            requester,
            self.phase()
        );
        self.finish(None, EndReason::Aborted { by: requester });
        Ok(())
    }

    /// Clue text from any chat member. Only the current turn holder's text
    /// counts; everything else is silently ignored.
    pub fn submit_clue(&mut self, player: PlayerId, text: &str) -> SessionResult<()> {
        if self.is_terminated() {
            return Ok(());
        }
        if !self.roster.contains(player) {
            self.suppress_outsider(player);
            return Ok(());
        }

        let text = if self.settings.exclamation_mode {
            match text.trim_start().strip_prefix(EXCLAMATION_PREFIX) {
                Some(rest) => rest,
                None => return Ok(()),
            }
        } else {
            text
        };
        let text = sanitize_input(text);
        if text.is_empty() {
            return Ok(());
        }

        let step = match &mut self.state {
            PhaseState::ClueRound(round) => round.accept(player, text.clone()),
            PhaseState::Tiebreak(Tiebreak {
                stage: TiebreakStage::Clues(round),
                ..
            }) => round.accept(player, text.clone()),
            _ => ClueStep::Ignored,
        };

        match step {
            ClueStep::Ignored => {}
            ClueStep::Next(next) => {
                self.emit(Content::ClueAccepted { player, text });
                let tiebreak = self.phase() == Phase::Tiebreak;
                self.emit(Content::TurnStarted {
                    player: next,
                    round: self.round,
                    tiebreak,
                });
            }
            ClueStep::Complete => {
                self.emit(Content::ClueAccepted { player, text });
                self.open_ballot();
            }
        }
        Ok(())
    }

    /// A guess at the common word, accepted from any alive player at any
    /// point of an active game.
    pub fn submit_guess(&mut self, player: PlayerId, text: &str) -> SessionResult<()> {
        if self.is_terminated() {
            return Ok(());
        }
        if !self.roster.contains(player) {
            self.suppress_outsider(player);
            return Ok(());
        }
        if !self.roster.is_alive(player) {
            return Ok(());
        }
        let Some(pair) = &self.pair else {
            return Ok(());
        };
        if text.trim() != pair.common {
            return Ok(());
        }

        let word = pair.common.clone();
        log::info!(
            "Chat {}: {} guessed the common word during {}",
            self.chat_id,
            player,
            self.phase()
        );
        self.emit(Content::WordGuessed { player, word });
        self.finish(Some(Winner::Defenders), EndReason::WordGuessed { by: player });
        Ok(())
    }

    pub fn cast_vote(&mut self, voter: PlayerId, target: PlayerId) -> SessionResult<()> {
        self.ensure_open()?;
        let voter_alive = self
            .roster
            .get(voter)
            .map(|p| p.alive)
            .ok_or(SessionError::NotAPlayer(voter))?;
        if !voter_alive {
            return Err(SessionError::PlayerEliminated(voter));
        }
        if !self.roster.is_alive(target) {
            return Err(SessionError::InvalidVoteTarget(target));
        }

        let phase = self.phase();
        let ballot = match &mut self.state {
            PhaseState::Voting(Voting { ballot }) => ballot,
            PhaseState::Tiebreak(Tiebreak {
                stage: TiebreakStage::Voting(ballot),
                ..
            }) => ballot,
            _ => return Err(SessionError::WrongPhase(phase)),
        };
        ballot.cast(voter, target)?;
        let pending = ballot.pending().len();
        let complete = ballot.is_complete();

        self.emit(Content::VoteCast {
            voter,
            target,
            pending,
        });
        if complete {
            self.close_ballot()?;
        }
        Ok(())
    }

    /// Returns the player's stored word. Never regenerates it.
    pub fn reveal_word(&mut self, player: PlayerId) -> SessionResult<()> {
        self.ensure_open()?;
        let assignment = self
            .roster
            .get(player)
            .ok_or(SessionError::NotAPlayer(player))?
            .assignment()
            .ok_or(SessionError::NotAssigned)?;
        let word = assignment.word.clone();
        self.intents.push(DisplayIntent::private(
            self.chat_id,
            player,
            Content::WordReveal { word },
        ));
        Ok(())
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.is_terminated() {
            return Err(SessionError::SessionClosed(self.chat_id));
        }
        Ok(())
    }

    fn emit(&mut self, content: Content) {
        self.intents
            .push(DisplayIntent::broadcast(self.chat_id, content));
    }

    fn suppress_outsider(&mut self, player: PlayerId) {
        let in_game = !matches!(self.state, PhaseState::Lobby(_));
        if self.settings.restrict_non_players && in_game {
            self.emit(Content::SuppressMessage { player });
        }
    }

    fn assign_roles(&mut self, pair: &WordPair) {
        let impostor_idx = self.rng.random_range(0..self.roster.len());
        for (idx, player) in self.roster.iter_mut().enumerate() {
            let (role, word) = if idx == impostor_idx {
                (Role::Impostor, pair.impostor.clone())
            } else {
                (Role::Defender, pair.common.clone())
            };
            player.assignment = Some(Assignment { role, word });
        }
    }

    fn begin_clue_round(&mut self) {
        self.round += 1;
        self.roster.reset_votes_received();
        let order = self.roster.turn_order((self.round - 1) as usize);
        let first = order.first().copied();
        self.state = ClueRound::new(order).into();
        if let Some(player) = first {
            self.emit(Content::TurnStarted {
                player,
                round: self.round,
                tiebreak: false,
            });
        }
    }

    /// Opens the ballot for the current stage. In a tiebreak only the tied
    /// players vote, and only on each other; everyone else observes.
    fn open_ballot(&mut self) {
        let voters = self.roster.alive_ids();
        let (candidates, tiebreak) = if let PhaseState::Tiebreak(tiebreak) = &mut self.state {
            let candidates = tiebreak.candidates.clone();
            tiebreak.stage =
                TiebreakStage::Voting(Ballot::new(candidates.clone(), candidates.clone()));
            (candidates, true)
        } else {
            self.state = Voting {
                ballot: Ballot::new(voters.clone(), voters.clone()),
            }
            .into();
            (voters, false)
        };
        self.emit(Content::VotingOpened {
            candidates,
            tiebreak,
        });
    }

    fn close_ballot(&mut self) -> SessionResult<()> {
        let (ballot, tiebreak) = match &self.state {
            PhaseState::Voting(Voting { ballot }) => (ballot.clone(), false),
            PhaseState::Tiebreak(Tiebreak {
                stage: TiebreakStage::Voting(ballot),
                ..
            }) => (ballot.clone(), true),
            other => {
                return Err(SessionError::InvariantViolation(format!(
                    "closing a ballot during {}",
                    other.phase()
                )));
            }
        };

        let counts = tally(ballot.votes());
        self.roster.reset_votes_received();
        for (target, count) in &counts {
            if let Some(player) = self.roster.get_mut(*target) {
                player.votes_received = *count;
            }
        }

        match resolve(&counts) {
            VoteOutcome::Eliminate(target) => self.eliminate(target, &ballot),
            // A tiebreak that narrows the tie recurses on the smaller set.
            VoteOutcome::Tie(tied) if !tiebreak || tied.len() < ballot.candidates().len() => {
                self.begin_tiebreak(tied);
                Ok(())
            }
            VoteOutcome::Tie(_) | VoteOutcome::NoVotes => {
                self.emit(Content::NoElimination {
                    candidates: ballot.candidates(),
                });
                self.after_resolution();
                Ok(())
            }
        }
    }

    fn eliminate(&mut self, target: PlayerId, ballot: &Ballot) -> SessionResult<()> {
        let player = self.roster.get_mut(target).ok_or_else(|| {
            SessionError::InvariantViolation(format!("eliminating unknown player {target}"))
        })?;
        if !player.alive {
            return Err(SessionError::InvariantViolation(format!(
                "vote recorded against eliminated player {target}"
            )));
        }
        player.alive = false;
        let was_impostor = player.is_impostor();
        let votes = player.votes_received;

        log::info!(
            "Chat {}: eliminated {} in round {} (impostor: {})",
            self.chat_id,
            target,
            self.round,
            was_impostor
        );
        if was_impostor {
            self.eliminating_voters = ballot.voters_for(target);
        }
        self.emit(Content::PlayerEliminated {
            player: target,
            was_impostor,
            votes,
        });
        self.after_resolution();
        Ok(())
    }

    fn begin_tiebreak(&mut self, tied: Vec<PlayerId>) {
        let order: Vec<PlayerId> = self
            .roster
            .turn_order(0)
            .into_iter()
            .filter(|id| tied.contains(id))
            .collect();
        let first = order.first().copied();
        log::debug!("Chat {}: tiebreak between {:?}", self.chat_id, tied);

        self.state = Tiebreak {
            candidates: tied.clone(),
            stage: TiebreakStage::Clues(ClueRound::new(order)),
        }
        .into();
        self.emit(Content::TiebreakStarted { candidates: tied });
        if let Some(player) = first {
            self.emit(Content::TurnStarted {
                player,
                round: self.round,
                tiebreak: true,
            });
        }
    }

    /// Ends the game if a side has won, otherwise starts the next cycle.
    fn after_resolution(&mut self) {
        match check_winner(&self.roster) {
            Some(Winner::Defenders) => {
                self.finish(Some(Winner::Defenders), EndReason::ImpostorEliminated)
            }
            Some(Winner::Impostor) => {
                self.finish(Some(Winner::Impostor), EndReason::ImpostorSurvived)
            }
            None => self.begin_clue_round(),
        }
    }

    fn finish(&mut self, winner: Option<Winner>, reason: EndReason) {
        log::debug!("Chat {}: {} -> {}", self.chat_id, self.phase(), Phase::Scoring);

        let eliminating_voters = std::mem::take(&mut self.eliminating_voters);
        let deltas = score_deltas(&self.roster, winner, &eliminating_voters);
        for player in self.roster.iter_mut() {
            player.score_delta = deltas.get(&player.id).copied().unwrap_or(0);
        }

        let ended_at = Utc::now();
        let duration_secs = (ended_at - self.started_at.unwrap_or(self.created_at)).num_seconds();
        let result = GameResult {
            game_id: self.game_id,
            chat_id: self.chat_id,
            pair: self.pair.clone(),
            winner,
            reason: reason.clone(),
            players: self
                .roster
                .iter()
                .map(|p| PlayerResult {
                    id: p.id,
                    name: p.name.clone(),
                    role: p.role(),
                    alive: p.alive,
                    outcome: player_outcome(p.role(), winner),
                    score_delta: p.score_delta,
                })
                .collect(),
            rounds: self.round,
            tournament: self.settings.tournament_mode,
            created_at: self.created_at,
            started_at: self.started_at,
            ended_at,
            duration_secs,
        };

        log::info!(
            "Chat {}: game {} finished ({:?}, winner: {:?})",
            self.chat_id,
            self.game_id,
            reason,
            winner
        );
        self.intents.push(
            DisplayIntent::broadcast(
                self.chat_id,
                Content::GameOver {
                    result: Box::new(result.clone()),
                },
            )
            .pinned(self.settings.pin_results),
        );
        self.state = Terminated { reason }.into();
        self.result = Some(result);
    }
}
