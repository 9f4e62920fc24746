//! Session controller: one game, its logical clock, its random source and
//! its opponent.
//!
//! The session is the only owner of a [`GameState`]. Drivers hand it actions
//! with [`Session::dispatch`] and move time forward with [`Session::advance`];
//! every deferred action (turn countdown, AI thinking, move pacing, mutation
//! waves) lives on the session's [`Clock`].
//!
//! # Deferred Chains
//!
//! ```text
//!   countdown     playing, not animating        tick      UPDATE_TIMER(left - 1)
//!   ai            ai mode, player2 to move      think     SELECT_TILE(from)
//!                   -> after commit delay                 AI_MOVE(from, to)
//!   presentation  animating                     anim      SET_ANIMATION(false)
//!                   -> after clear delay (if combos)      CLEAR_COMBOS
//!                   -> after switch delay                 SWITCH_TURN
//!   mutation      mutations pending             mutate    MUTATE_TILES
//! ```
//!
//! Each chain is re-armed whenever the part of the state it depends on
//! changes, which cancels the old timer. Follow-up timers (commit, clear,
//! switch) remember the player and history length they were scheduled for
//! and are dropped once either changes.
//!
//! The clock does not run while the game is paused.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::clock::{Clock, TimerHandle};
use crate::state::{Action, GameMode, GameState, Phase};
use crate::{Player, Pos};

/// Picks moves for the AI side.
pub trait Opponent: Send {
    /// Choose a `(from, to)` pair for the player to move in `state`, or
    /// `None` when there is nothing to play.
    fn choose_move(&mut self, state: &GameState) -> Option<(Pos, Pos)>;
}

/// Delays (ms) used by the deferred chains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pacing {
    pub tick_ms: u64,
    pub ai_think_ms: u64,
    pub ai_commit_ms: u64,
    pub animation_ms: u64,
    pub clear_combos_ms: u64,
    pub switch_turn_ms: u64,
    pub mutation_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing {
            tick_ms: 1_000,
            ai_think_ms: 1_000,
            ai_commit_ms: 500,
            animation_ms: 1_000,
            clear_combos_ms: 500,
            switch_turn_ms: 800,
            mutation_ms: 1_000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Deferred {
    Countdown,
    AiThink,
    AiCommit { from: Pos, to: Pos },
    AnimationDone,
    ClearCombos,
    SwitchTurn,
    Mutate,
}

/// A timer that is re-armed whenever its key changes and disarmed while the
/// key is `None`.
#[derive(Debug)]
struct Watch<K> {
    key: Option<K>,
    handle: Option<TimerHandle>,
}

impl<K: PartialEq> Watch<K> {
    fn new() -> Self {
        Watch { key: None, handle: None }
    }

    fn sync(&mut self, clock: &mut Clock<Deferred>, key: Option<K>, delay_ms: u64, event: Deferred) {
        if self.key == key {
            return;
        }
        if let Some(handle) = self.handle.take() {
            clock.cancel(handle);
        }
        if key.is_some() {
            self.handle = Some(clock.schedule(delay_ms, event));
        }
        self.key = key;
    }

    /// True if `handle` is this watch's live timer. The key is kept, so the
    /// watch fires once per key.
    fn fired(&mut self, handle: TimerHandle) -> bool {
        if self.handle == Some(handle) {
            self.handle = None;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.key = None;
        self.handle = None;
    }
}

/// The state a follow-up timer was scheduled for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Guard {
    player: Player,
    history_len: usize,
}

impl Guard {
    fn of(state: &GameState) -> Self {
        Guard {
            player: state.current_player,
            history_len: state.move_history.len(),
        }
    }

    fn holds(&self, state: &GameState) -> bool {
        state.current_player == self.player && state.move_history.len() == self.history_len
    }
}

#[derive(Debug)]
struct FollowUp {
    handle: TimerHandle,
    guard: Guard,
    event: Deferred,
}

pub struct Session {
    state: GameState,
    clock: Clock<Deferred>,
    rng: StdRng,
    opponent: Option<Box<dyn Opponent>>,
    pacing: Pacing,
    countdown: Watch<(Player, u32, u32)>,
    ai: Watch<(Player, u32, usize)>,
    presentation: Watch<u64>,
    mutation: Watch<Vec<Pos>>,
    follow_ups: Vec<FollowUp>,
    animation_epoch: u64,
    was_animating: bool,
}

impl Session {
    /// A session in the setup phase. `seed` drives every random choice.
    pub fn new(seed: u64, pacing: Pacing) -> Self {
        Session {
            state: GameState::new(),
            clock: Clock::new(),
            rng: StdRng::seed_from_u64(seed),
            opponent: None,
            pacing,
            countdown: Watch::new(),
            ai: Watch::new(),
            presentation: Watch::new(),
            mutation: Watch::new(),
            follow_ups: Vec::new(),
            animation_epoch: 0,
            was_animating: false,
        }
    }

    pub fn with_opponent(mut self, opponent: Box<dyn Opponent>) -> Self {
        self.set_opponent(Some(opponent));
        self
    }

    pub fn set_opponent(&mut self, opponent: Option<Box<dyn Opponent>>) {
        self.opponent = opponent;
        self.sync_timers();
    }

    #[inline]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Logical time in ms.
    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// Logical time of the next deferred action, if any.
    pub fn next_due(&self) -> Option<u64> {
        self.clock.next_due()
    }

    /// True between the end of a move's presentation and the turn switch.
    pub fn awaiting_switch(&self) -> bool {
        self.follow_ups.iter().any(|f| f.event == Deferred::SwitchTurn)
    }

    /// Apply an action from outside (a player or a driver).
    ///
    /// Tile input is ignored while a turn switch is pending so that a player
    /// cannot move twice in one turn. Ending the animation early runs the
    /// same presentation chain as the timer would.
    pub fn dispatch(&mut self, action: Action) -> &GameState {
        if action == Action::SetAnimation(false) && self.state.is_animating {
            debug!("animation ended early");
            self.finish_presentation();
            return &self.state;
        }
        let is_input = matches!(
            action,
            Action::SelectTile(_) | Action::MoveTile(_) | Action::AiMove { .. }
        );
        if is_input && self.awaiting_switch() {
            debug!(?action, "input ignored while the turn switch is pending");
            return &self.state;
        }
        if matches!(action, Action::InitGame { .. } | Action::ResetGame) {
            self.clear_timers();
        }
        self.apply(action);
        &self.state
    }

    /// Move logical time forward by `ms`, firing everything that falls due.
    pub fn advance(&mut self, ms: u64) -> &GameState {
        if self.state.phase == Phase::Paused {
            return &self.state;
        }
        let until = self.clock.now() + ms;
        while let Some((handle, event)) = self.clock.pop_due(until) {
            self.fire(handle, event);
        }
        self.clock.advance_to(until);
        &self.state
    }

    fn apply(&mut self, action: Action) {
        let now = self.clock.now();
        self.state = self.state.reduce(action, &mut self.rng, now);
        self.sync_timers();
    }

    fn clear_timers(&mut self) {
        self.clock.clear();
        self.countdown.reset();
        self.ai.reset();
        self.presentation.reset();
        self.mutation.reset();
        self.follow_ups.clear();
    }

    // ========== Timer Bookkeeping ==========

    fn sync_timers(&mut self) {
        let state = &self.state;
        let clock = &mut self.clock;
        self.follow_ups.retain(|follow_up| {
            let live = follow_up.guard.holds(state);
            if !live {
                trace!(event = ?follow_up.event, "follow-up cancelled");
                clock.cancel(follow_up.handle);
            }
            live
        });

        if self.state.is_animating && !self.was_animating {
            self.animation_epoch += 1;
        }
        self.was_animating = self.state.is_animating;

        let countdown_key = self
            .state
            .accepts_input()
            .then(|| (self.state.current_player, self.state.round_number, self.state.turn_time_left));
        let ai_key = self.ai_key();
        let presentation_key = self.state.is_animating.then_some(self.animation_epoch);
        let mutation_key = (self.state.phase == Phase::Playing && !self.state.mutations.is_empty())
            .then(|| self.state.mutations.clone());

        let pacing = self.pacing;
        self.countdown
            .sync(&mut self.clock, countdown_key, pacing.tick_ms, Deferred::Countdown);
        self.ai
            .sync(&mut self.clock, ai_key, pacing.ai_think_ms, Deferred::AiThink);
        self.presentation.sync(
            &mut self.clock,
            presentation_key,
            pacing.animation_ms,
            Deferred::AnimationDone,
        );
        self.mutation
            .sync(&mut self.clock, mutation_key, pacing.mutation_ms, Deferred::Mutate);
    }

    fn ai_key(&self) -> Option<(Player, u32, usize)> {
        let state = &self.state;
        let ready = self.opponent.is_some()
            && state.game_mode == GameMode::Ai
            && state.current_player == Player::Two
            && state.accepts_input()
            && !self.awaiting_switch();
        ready.then(|| (state.current_player, state.round_number, state.move_history.len()))
    }

    fn follow_up(&mut self, delay_ms: u64, event: Deferred) {
        let handle = self.clock.schedule(delay_ms, event);
        self.follow_ups.push(FollowUp {
            handle,
            guard: Guard::of(&self.state),
            event,
        });
    }

    // ========== Firing ==========

    fn fire(&mut self, handle: TimerHandle, event: Deferred) {
        trace!(?event, at = self.clock.now(), "timer fired");
        match event {
            Deferred::Countdown => {
                if self.countdown.fired(handle) {
                    let left = self.state.turn_time_left as i64;
                    self.apply(Action::UpdateTimer(left - 1));
                }
            }
            Deferred::AiThink => {
                if self.ai.fired(handle) {
                    self.think();
                }
            }
            Deferred::AnimationDone => {
                if self.presentation.fired(handle) {
                    self.finish_presentation();
                }
            }
            Deferred::Mutate => {
                if self.mutation.fired(handle) {
                    let positions = self.state.mutations.clone();
                    self.apply(Action::MutateTiles(positions));
                }
            }
            Deferred::AiCommit { .. } | Deferred::ClearCombos | Deferred::SwitchTurn => {
                self.fire_follow_up(handle, event);
            }
        }
    }

    fn think(&mut self) {
        let choice = match self.opponent.as_mut() {
            Some(opponent) => opponent.choose_move(&self.state),
            None => return,
        };
        match choice {
            Some((from, to)) => {
                debug!(%from, %to, "opponent chose a move");
                self.apply(Action::SelectTile(from));
                self.follow_up(self.pacing.ai_commit_ms, Deferred::AiCommit { from, to });
            }
            None => warn!(player = %self.state.current_player, "opponent found no move, waiting for the turn timer"),
        }
    }

    fn finish_presentation(&mut self) {
        // Follow-ups go in first so the AI chain sees the pending switch.
        if !self.state.combos.is_empty() {
            self.follow_up(self.pacing.clear_combos_ms, Deferred::ClearCombos);
        }
        self.follow_up(self.pacing.switch_turn_ms, Deferred::SwitchTurn);
        self.apply(Action::SetAnimation(false));
    }

    fn fire_follow_up(&mut self, handle: TimerHandle, event: Deferred) {
        let Some(index) = self.follow_ups.iter().position(|f| f.handle == handle) else {
            trace!(?event, "stale follow-up dropped");
            return;
        };
        let follow_up = self.follow_ups.swap_remove(index);
        if !follow_up.guard.holds(&self.state) {
            return;
        }
        let action = match event {
            Deferred::AiCommit { from, to } => Action::AiMove { from, to },
            Deferred::ClearCombos => Action::ClearCombos,
            Deferred::SwitchTurn => Action::SwitchTurn,
            _ => return,
        };
        self.apply(action);
    }
}
