//! The frontier-based branch-and-bound search.
//!
//! The search walks a tree of transition commitments. Each node owns its
//! whole state by value; a branch clones the state, commits one transition
//! at one frontier cell, propagates the stable consequences around that
//! column and recurses. The last transition of a cell reuses the parent's
//! storage, so the hot path allocates nothing but the per-branch clone.
//!
//! Solutions and seen rotors live outside the branch state, threaded
//! through the recursion as a context, so they survive backtracking.

use crate::{
    board::{BitBoard, Cell, N},
    config::SearchParams,
    count::Countdown,
    frontier::{allowed_transitions_for, Frontier, FrontierGeneration, MAX_FRONTIER_GENS},
    rle,
    rotor,
    stable::{LifeStable, StableOptions},
    transition::Transition,
    unknown::LifeUnknown,
};
use log::{debug, info};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

/// How many frontier generations may be branched into.
pub const MAX_BRANCHING_GENS: usize = MAX_FRONTIER_GENS;

/// Width of the per-cell timers, in bit planes.
const TIMER_BITS: usize = 3;

/// Largest per-cell window/streak cap the compiled timers support.
pub const MAX_CELL_TIMER_GENS: u32 = (1 << TIMER_BITS) - 1;

/// A recorded catalyst recovery.
#[derive(Clone, Debug)]
pub struct Solution {
    /// The found configuration: the stable cells with the original active
    /// pattern overlaid.
    pub state: BitBoard,
    /// A concrete still-life completion of the unknown region, or empty if
    /// completion failed or was disabled.
    pub completed: BitBoard,
    /// The stable state at the moment of recovery.
    pub stable: LifeStable,
    /// Generation at which the catalyst was first perturbed.
    pub interaction_gen: u32,
    /// Generation at which it had recovered.
    pub recovery_gen: u32,
}

/// Mutable results shared by every branch of one search.
struct Context<'a> {
    params: &'a SearchParams,
    solutions: &'a mut Vec<Solution>,
    seen_rotors: &'a mut Vec<String>,
    abort: &'a AtomicBool,
}

/// A whole search run: owns the parameters and collects the results.
pub struct Search {
    params: SearchParams,
    solutions: Vec<Solution>,
    seen_rotors: Vec<String>,
}

impl Search {
    pub fn new(params: SearchParams) -> Self {
        Search {
            params,
            solutions: Vec::new(),
            seen_rotors: Vec::new(),
        }
    }

    /// Runs the search to completion.
    pub fn run(&mut self) {
        let abort = AtomicBool::new(false);
        self.run_with_abort(&abort);
    }

    /// Runs the search, checking `abort` at every branch step. Aborting
    /// mid-recursion is safe: branches are independent clones.
    pub fn run_with_abort(&mut self, abort: &AtomicBool) {
        let mut ctx = Context {
            params: &self.params,
            solutions: &mut self.solutions,
            seen_rotors: &mut self.seen_rotors,
            abort,
        };
        let mut root = Box::new(BranchState::new(ctx.params));
        root.step(&mut ctx);
        info!("search finished with {} solution(s)", self.solutions.len());
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    /// Prints all recorded solutions as rows of up to eight patterns.
    pub fn print_summary(&self) {
        println!("x = 0, y = 0, rule = B3/S23");
        for chunk in self.solutions.chunks(8) {
            let row: Vec<BitBoard> = chunk.iter().map(|s| s.state | s.completed).collect();
            println!("{}", rle::row_rle(&row));
        }
    }
}

/// The per-branch search state, cloned on every non-tail commitment.
#[derive(Clone)]
struct BranchState {
    stable: LifeStable,
    current: LifeUnknown,
    frontier: Frontier,

    ever_active: BitBoard,
    active_timer: Countdown<TIMER_BITS>,
    streak_timer: Countdown<TIMER_BITS>,

    /// The stable state at the last probing pass, to avoid re-probing
    /// unchanged regions.
    last_test: LifeStable,
    time_since_propagate: u32,

    current_gen: u32,
    has_interacted: bool,
    interaction_start: u32,
    recovered_time: u32,
}

impl BranchState {
    fn new(params: &SearchParams) -> Self {
        BranchState {
            stable: params.stable.clone(),
            current: params.starting_state,
            frontier: Frontier::default(),
            ever_active: BitBoard::new(),
            active_timer: Countdown::new(params.max_cell_active_window.max(0) as u32),
            streak_timer: Countdown::new(params.max_cell_active_streak.max(0) as u32),
            // A blank baseline makes the first probing pass cover every
            // vulnerable cell.
            last_test: LifeStable::new(),
            time_since_propagate: 0,
            current_gen: 0,
            has_interacted: false,
            interaction_start: 0,
            recovered_time: 0,
        }
    }

    /// Cells that must not differ from the stable background in
    /// generation `gen`, given the activity so far. A full board means the
    /// generation is already in violation.
    #[allow(clippy::too_many_arguments)]
    fn forced_inactive_cells(
        &self,
        params: &SearchParams,
        gen: u32,
        state: &LifeUnknown,
        active: &BitBoard,
        changes: &BitBoard,
        active_timer: &Countdown<TIMER_BITS>,
        streak_timer: &Countdown<TIMER_BITS>,
    ) -> BitBoard {
        if gen < params.min_first_active_gen {
            return BitBoard::full();
        }

        let active_pop = active.population();

        if self.has_interacted
            && !params.report_oscillators
            && gen > self.interaction_start + params.max_active_window_gens
        {
            return BitBoard::full();
        }

        if params.max_active_cells != -1 && active_pop > params.max_active_cells as u32 {
            return BitBoard::full();
        }

        let mut result = BitBoard::new();

        if params.max_active_cells != -1 && active_pop == params.max_active_cells as u32 {
            result |= !*active;
        }

        if params.active_bounds.0 != -1 && active_pop > 0 {
            result |= !active.buffer_around(params.active_bounds);
        }

        if params.max_ever_active_cells != -1
            && self.ever_active.population() == params.max_ever_active_cells as u32
        {
            result |= !self.ever_active;
        }

        if params.ever_active_bounds.0 != -1 {
            result |= !self.ever_active.buffer_around(params.ever_active_bounds);
        }

        if params.max_component_active_cells != -1
            && active_pop > params.max_component_active_cells as u32
        {
            for component in active.components() {
                let component_pop = component.population();
                if component_pop > params.max_component_active_cells as u32 {
                    return BitBoard::full();
                }
                if component_pop == params.max_component_active_cells as u32 {
                    result |= !*active & component.big_zoi();
                }
            }
        }

        if params.max_component_ever_active_cells != -1
            && self.ever_active.population() > params.max_component_ever_active_cells as u32
        {
            for component in self.ever_active.components() {
                let component_pop = component.population();
                if component_pop > params.max_component_ever_active_cells as u32 {
                    return BitBoard::full();
                }
                if component_pop == params.max_component_ever_active_cells as u32 {
                    result |= !component & component.big_zoi();
                }
            }
        }

        if params.component_ever_active_bounds.0 != -1 {
            for component in self.ever_active.components() {
                let (w, h) = component.width_height();
                if w as i32 > params.component_ever_active_bounds.0
                    || h as i32 > params.component_ever_active_bounds.1
                {
                    return BitBoard::full();
                }
                result |=
                    !component.buffer_around(params.component_ever_active_bounds) & component.big_zoi();
            }
        }

        if params.max_cell_active_window != -1
            && self.has_interacted
            && gen > self.interaction_start + params.max_cell_active_window as u32
        {
            result |= active_timer.finished;
        }

        if params.max_cell_active_streak != -1
            && self.has_interacted
            && gen > self.interaction_start + params.max_cell_active_streak as u32
        {
            result |= streak_timer.finished;
        }

        if params.max_cell_stationary_distance != -1 {
            let d = params.max_cell_stationary_distance;
            let unchanging = !(*changes | (state.unknown & !state.unknown_stable));
            let reach = BitBoard::solid_rect(-d, -d, (2 * d + 1) as u32, (2 * d + 1) as u32);
            result |= unchanging.match_live(&reach);
        }

        result
    }

    /// Cells that must not differ from the previous generation.
    fn forced_unchanging_cells(
        &self,
        params: &SearchParams,
        changes: &BitBoard,
    ) -> BitBoard {
        let mut result = BitBoard::new();

        if params.max_changes != -1 {
            let changes_pop = changes.population();
            if changes_pop > params.max_changes as u32 {
                return BitBoard::full();
            }
            if changes_pop == params.max_changes as u32 {
                result |= !*changes;
            }
        }

        if params.max_component_changes != -1 {
            for component in changes.components() {
                let component_pop = component.population();
                if component_pop > params.max_component_changes as u32 {
                    return BitBoard::full();
                }
                if component_pop == params.max_component_changes as u32 {
                    result |= !*changes & component.big_zoi();
                }
            }
        }

        if params.changes_bounds.0 != -1 {
            result |= !changes.buffer_around(params.changes_bounds);
        }

        if params.component_changes_bounds.0 != -1 {
            for component in changes.components() {
                let (w, h) = component.width_height();
                if w as i32 > params.component_changes_bounds.0
                    || h as i32 > params.component_changes_bounds.1
                {
                    return BitBoard::full();
                }
                result |=
                    !component.buffer_around(params.component_changes_bounds) & component.big_zoi();
            }
        }

        if params.has_stator {
            result |= params.stator;
        }

        result
    }

    /// Recomputes a generation's activity and forcing masks; false when a
    /// constraint is already violated.
    fn update_active(
        &mut self,
        params: &SearchParams,
        generation: &mut FrontierGeneration,
        active_timer: &Countdown<TIMER_BITS>,
        streak_timer: &Countdown<TIMER_BITS>,
    ) -> bool {
        generation.active =
            generation.state.active_compared_to(&self.stable) & self.stable.state_zoi;
        generation.changes =
            generation.state.changes_compared_to(&generation.prev) & self.stable.state_zoi;

        self.ever_active |= generation.active;

        generation.forced_inactive = self.forced_inactive_cells(
            params,
            generation.gen,
            &generation.state,
            &generation.active,
            &generation.changes,
            active_timer,
            streak_timer,
        );
        if !(generation.active & generation.forced_inactive).is_empty() {
            return false;
        }

        generation.forced_unchanging = self.forced_unchanging_cells(params, &generation.changes);
        if !(generation.changes & generation.forced_unchanging).is_empty() {
            return false;
        }

        true
    }

    /// The stable options compatible with `transition` happening at
    /// `cell`, given the counts around it.
    fn options_for(
        &self,
        state: &LifeUnknown,
        cell: Cell,
        transition: Transition,
    ) -> StableOptions {
        let current_on = state.state.count_neighbours(cell);
        let unknown = state.unknown.count_neighbours(cell);
        let stable_on = self.stable.state.count_neighbours(cell);
        let unknown_stable = state.unknown_stable.get(cell);

        let counts = |current: bool, next: bool| {
            options_for_counts(current, next, current_on, unknown, stable_on)
        };

        if transition == Transition::STABLE_TO_STABLE {
            return (counts(false, false) & StableOptions::DEAD)
                | (counts(true, true) & StableOptions::LIVE);
        }

        let current = transition.intersects(Transition::ON_TO_OFF | Transition::ON_TO_ON);
        let next = transition.intersects(Transition::OFF_TO_ON | Transition::ON_TO_ON);
        let mut options = counts(current, next);
        if unknown_stable {
            options &= if current {
                StableOptions::LIVE
            } else {
                StableOptions::DEAD
            };
        }
        options
    }

    /// Settles every frontier cell whose transition set collapses; forced
    /// transitions are committed and removed from the frontier.
    fn set_forced(
        &mut self,
        generation: &mut FrontierGeneration,
    ) -> (bool, bool) {
        let mut any_changes = false;
        let mut remaining = generation.frontier_cells;

        while let Some(cell) = remaining.first_on() {
            remaining.erase(cell);

            self.stable.update_cell_known(cell);
            generation.prev.transfer_stable_cell(&self.stable, cell);
            generation.state.transfer_stable_cell(&self.stable, cell);

            let mut allowed = allowed_transitions_for(generation, &self.stable, cell);
            if allowed.is_empty() {
                return (false, false);
            }

            let starting_options = self.stable.get_options(cell);
            let mut possible_options = StableOptions::empty();

            // See which options and transitions can actually be realised.
            let mut untried = allowed;
            while !untried.is_empty() {
                let transition = untried.highest();
                untried &= !transition;

                let transition_options =
                    starting_options & self.options_for(&generation.prev, cell, transition);
                possible_options |= transition_options;
                if transition_options.is_empty() {
                    allowed &= !transition;
                }
            }

            let new_options = possible_options & starting_options;
            if new_options.is_empty() {
                return (false, false);
            }

            self.stable.restrict_options(cell, new_options);
            self.stable.update_cell_known(cell);
            if new_options != starting_options {
                any_changes = true;
            }

            let allowed = allowed.simplify();
            if allowed.is_singleton() {
                generation.set_transition(cell, allowed);
                generation.frontier_cells.erase(cell);
            }
        }

        (true, any_changes)
    }

    /// A cheap lookahead that only checks the forcing masks, before the
    /// full frontier is computed.
    fn fast_lookahead(&mut self, params: &SearchParams) -> bool {
        let mut prev = self.current;
        let mut gen = self.current_gen;

        for _ in 0..params.max_fast_lookahead_gens {
            gen += 1;
            let generation = prev.step_maintaining(&self.stable);

            let active = generation.active_compared_to(&self.stable) & self.stable.state_zoi;
            let changes = generation.changes_compared_to(&prev) & self.stable.state_zoi;
            self.ever_active |= active;

            let forced_inactive = self.forced_inactive_cells(
                params,
                gen,
                &generation,
                &active,
                &changes,
                &self.active_timer,
                &self.streak_timer,
            );
            if !(active & forced_inactive).is_empty() {
                return false;
            }

            let forced_unchanging = self.forced_unchanging_cells(params, &changes);
            if !(changes & forced_unchanging).is_empty() {
                return false;
            }

            let alive =
                !((prev.state ^ generation.state) & !prev.unknown & !generation.unknown).is_empty();
            if !alive {
                break;
            }
            prev = generation;
        }
        true
    }

    /// Steps the lookahead forward, collecting activity masks and frontier
    /// cells per generation.
    fn populate_frontier(&mut self, params: &SearchParams) -> (bool, bool) {
        let mut any_changes = false;

        self.current.transfer_stable(&self.stable);
        self.frontier.clear();

        let mut lookahead = self.current;
        let mut gen = self.current_gen;

        let mut lookahead_active_timer = self.active_timer.clone();
        let mut lookahead_streak_timer = self.streak_timer.clone();

        for _ in 0..MAX_FRONTIER_GENS {
            gen += 1;

            let mut generation = FrontierGeneration {
                prev: lookahead,
                state: lookahead.step_maintaining(&self.stable),
                gen,
                ..FrontierGeneration::default()
            };

            if !self.update_active(
                params,
                &mut generation,
                &lookahead_active_timer,
                &lookahead_streak_timer,
            ) {
                return (false, false);
            }

            if params.max_cell_active_window != -1 {
                lookahead_active_timer.start(&generation.active);
                lookahead_active_timer.tick();
            }
            if params.max_cell_active_streak != -1 {
                lookahead_streak_timer.reset(&!generation.active);
                lookahead_streak_timer.start(&generation.active);
                lookahead_streak_timer.tick();
            }

            // Frontier cells became unknown out of a fully known
            // neighbourhood: the stable options alone decide them.
            let prev_unknown_active = generation.prev.unknown & !generation.prev.unknown_stable;
            let become_unknown = (generation.state.unknown & !generation.state.unknown_stable)
                & !prev_unknown_active;
            generation.frontier_cells = become_unknown & !prev_unknown_active.zoi();

            let (consistent, some_forced) = self.set_forced(&mut generation);
            if !consistent {
                return (false, false);
            }
            any_changes |= some_forced;

            let is_inert = ((generation.prev.state ^ generation.state.state)
                & !generation.prev.unknown
                & !generation.state.unknown)
                .is_empty()
                || (self.stable.state_zoi & !generation.state.unknown).is_empty();

            lookahead = generation.state;
            self.frontier.generations[self.frontier.len] = generation;
            self.frontier.len += 1;

            if is_inert {
                break;
            }
        }
        (true, any_changes)
    }

    /// Advances over fully-known head generations, doing the interaction
    /// and recovery bookkeeping. Returns `(keep going, advanced)`.
    fn try_advance(&mut self, ctx: &mut Context) -> (bool, bool) {
        let params = ctx.params;
        let mut did_advance = false;

        while self.frontier.len > 0 {
            let head = &self.frontier.generations[self.frontier.start];
            if !(head.state.unknown & !head.state.unknown_stable).is_empty() {
                break;
            }
            did_advance = true;

            self.current = head.state;
            self.current_gen += 1;
            self.frontier.start += 1;
            self.frontier.len -= 1;

            let active = self.current.active_compared_to(&self.stable) & self.stable.state_zoi;
            self.ever_active |= active;

            if params.max_cell_active_window != -1 {
                self.active_timer.start(&active);
                self.active_timer.tick();
            }
            if params.max_cell_active_streak != -1 {
                self.streak_timer.reset(&!active);
                self.streak_timer.start(&active);
                self.streak_timer.tick();
            }

            if self.has_interacted {
                let recovered =
                    ((self.stable.state ^ self.current.state) & self.stable.state_zoi).is_empty();
                if recovered {
                    self.recovered_time += 1;
                } else {
                    self.recovered_time = 0;
                }

                if recovered && self.recovered_time == params.min_stable_interval {
                    if !params.report_oscillators {
                        self.record_solution(ctx);
                    }
                    if !params.continue_after_success {
                        return (false, did_advance);
                    }
                }

                if self.current_gen > self.interaction_start + params.max_active_window_gens {
                    if params.report_oscillators {
                        self.record_oscillator(ctx);
                    }
                    return (false, did_advance);
                }
            } else if self.current_gen > params.max_first_active_gen {
                return (false, did_advance);
            }
        }

        (true, did_advance)
    }

    /// Rebuilds the frontier from scratch: lookahead, stable propagation
    /// and probing, forbidden-pattern checks, and advancing over known
    /// generations.
    fn calculate_frontier(&mut self, ctx: &mut Context) -> bool {
        self.current.transfer_stable(&self.stable);

        if !self.fast_lookahead(ctx.params) {
            return false;
        }

        let mut rounds = 0;
        let mut any_changes = true;
        while any_changes {
            any_changes = false;

            rounds += 1;
            if rounds > ctx.params.max_calculate_rounds {
                break;
            }

            let (consistent, some_changes) = self.populate_frontier(ctx.params);
            if !consistent {
                return false;
            }
            any_changes |= some_changes;

            let propagated = self.stable.propagate();
            if !propagated.consistent {
                return false;
            }
            any_changes |= propagated.changed;

            // Probing is worth it only near cells that changed since the
            // last probe.
            let to_test = self.stable.vulnerable().zoi()
                & self.stable.differences(&self.last_test).zoi()
                & self.stable.unknown;
            self.last_test = self.stable.clone();
            let tested = self.stable.test_unknowns(&to_test);
            if !tested.consistent {
                return false;
            }
            any_changes |= tested.changed;
        }

        for forbidden in &ctx.params.forbidden {
            let all_known = (forbidden.mask & self.stable.unknown).is_empty();
            if all_known && ((self.stable.state ^ forbidden.state) & forbidden.mask).is_empty() {
                debug!("branch hit a forbidden pattern");
                return false;
            }
        }

        let (consistent, did_advance) = self.try_advance(ctx);
        if !consistent {
            return false;
        }
        if did_advance && self.frontier.len == 0 {
            // Everything was known; start over from the new generation.
            return self.calculate_frontier(ctx);
        }

        true
    }

    /// The first frontier cell in generation order, column-then-row within
    /// a generation.
    fn choose_branch_cell(&self) -> Option<(usize, Cell)> {
        let stop = self.frontier.len.min(MAX_BRANCHING_GENS);
        for i in self.frontier.start..self.frontier.start + stop {
            if let Some(cell) = self.frontier.generations[i].frontier_cells.first_on() {
                return Some((i, cell));
            }
        }
        None
    }

    /// Commits one transition at one cell: narrows the options, propagates
    /// around the cell's column and does the interaction bookkeeping.
    fn commit(
        &mut self,
        i: usize,
        cell: Cell,
        transition: Transition,
        new_options: StableOptions,
    ) -> bool {
        self.stable.restrict_options(cell, new_options);
        self.stable.update_cell_known(cell);

        if !self.stable.propagate_strip(cell.0).consistent {
            return false;
        }

        let perturbation = self.frontier.generations[i]
            .prev
            .transition_is_perturbation(cell, transition);

        self.frontier.generations[i].frontier_cells.erase(cell);
        self.frontier.generations[i].set_transition(cell, transition);

        if perturbation {
            self.stable.state_zoi.set(cell);
            if !self.has_interacted {
                self.has_interacted = true;
                self.interaction_start = self.frontier.generations[i].gen;
                debug!("interaction starts at generation {}", self.interaction_start);
            }
        }
        true
    }

    /// One step of the branch-and-bound recursion. The loop is the tail
    /// call on the last remaining transition.
    fn step(&mut self, ctx: &mut Context) {
        loop {
            if ctx.abort.load(Ordering::Relaxed) {
                return;
            }

            let needs_recalculation = self.frontier.len == 0
                || self.frontier.head().frontier_cells.is_empty()
                || self.time_since_propagate > ctx.params.max_branch_fast_count;

            if needs_recalculation {
                if !self.calculate_frontier(ctx) {
                    return;
                }
                self.time_since_propagate = 0;
            } else {
                // Refresh just the head generation against the current
                // stable knowledge.
                let idx = self.frontier.start;
                let mut generation = std::mem::take(&mut self.frontier.generations[idx]);
                generation.prev.transfer_stable(&self.stable);
                generation.state.transfer_stable(&self.stable);

                let active_timer = self.active_timer.clone();
                let streak_timer = self.streak_timer.clone();
                if !self.update_active(ctx.params, &mut generation, &active_timer, &streak_timer) {
                    return;
                }
                self.time_since_propagate += 1;

                let (consistent, _) = self.set_forced(&mut generation);
                if !consistent {
                    return;
                }

                let now_empty = generation.frontier_cells.is_empty();
                self.frontier.generations[idx] = generation;

                if now_empty {
                    if !self.calculate_frontier(ctx) {
                        return;
                    }
                    self.time_since_propagate = 0;
                }
            }

            let Some((i, cell)) = self.choose_branch_cell() else {
                return;
            };

            self.stable.update_cell_known(cell);
            self.frontier.generations[i]
                .prev
                .transfer_stable_cell(&self.stable, cell);
            self.frontier.generations[i]
                .state
                .transfer_stable_cell(&self.stable, cell);

            let allowed =
                allowed_transitions_for(&self.frontier.generations[i], &self.stable, cell)
                    .simplify();
            if allowed.is_empty() {
                return;
            }

            // Branch on every transition but the last; perturbations come
            // first because the enumeration runs from the highest bit.
            let mut remaining = allowed;
            while !remaining.is_singleton() {
                let transition = remaining.highest();
                remaining &= !transition;

                let new_options = self.stable.get_options(cell)
                    & self.options_for(&self.frontier.generations[i].prev, cell, transition);
                if new_options.is_empty() {
                    continue;
                }

                let mut child = Box::new(self.clone());
                if child.commit(i, cell, transition, new_options) {
                    child.step(ctx);
                }
            }

            // The last transition reuses this state.
            let transition = remaining;
            let new_options = self.stable.get_options(cell)
                & self.options_for(&self.frontier.generations[i].prev, cell, transition);
            if new_options.is_empty() {
                return;
            }
            if !self.commit(i, cell, transition, new_options) {
                return;
            }
        }
    }

    /// Checks the vetoes, completes the stabilisation and reports.
    fn record_solution(&mut self, ctx: &mut Context) {
        let params = ctx.params;
        let recovery_gen = self.current_gen - params.min_stable_interval + 1;

        if recovery_gen.saturating_sub(self.interaction_start) < params.min_active_window_gens {
            debug!("solution rejected: active window shorter than the minimum");
            return;
        }

        if params.forbid_eater2 && contains_eater2(&self.stable.state, &self.ever_active) {
            debug!("solution rejected: eater2 stabilisation");
            return;
        }

        let starting_active = params.starting_state.state & !params.stable.state;
        let starting_stable_off = params.stable.state & !params.starting_state.state;

        let mut solution = Solution {
            state: (self.stable.state & !starting_stable_off) | starting_active,
            completed: BitBoard::new(),
            stable: self.stable.clone(),
            interaction_gen: self.interaction_start,
            recovery_gen,
        };

        if !passes_filter(params, &solution) {
            debug!("solution rejected by the filter");
            return;
        }

        if params.stabilise_results {
            solution.completed = self.stable.complete_stable(
                Duration::from_secs(params.stabilise_results_timeout),
                params.minimise_results,
            );
        }

        info!(
            "solution found: interaction at {}, recovery at {}",
            solution.interaction_gen, solution.recovery_gen
        );
        print_solution(&solution);
        ctx.solutions.push(solution);
    }

    /// Classifies a non-recovering branch as an oscillator and reports any
    /// new rotors.
    fn record_oscillator(&mut self, ctx: &mut Context) {
        let period = rotor::determine_period(&self.current, &self.stable);
        if period <= 4 {
            return;
        }

        let rotors = rotor::separated_rotor_descs(&self.current, &self.stable, period);
        let mut new_fingerprints = Vec::new();
        for rotor in rotors {
            let fingerprint = rotor.fingerprint();
            if !ctx.seen_rotors.contains(&fingerprint) {
                ctx.seen_rotors.push(fingerprint.clone());
                new_fingerprints.push(fingerprint);
            }
        }

        if !new_fingerprints.is_empty() {
            println!("Oscillating! Period: {period}");
            for fingerprint in &new_fingerprints {
                println!("Rotor: {fingerprint}");
            }
            self.record_solution(ctx);
        }
    }
}

/// The stable options compatible with a `(current, next)` pair of cell
/// values, from the neighbour counts.
///
/// The achievable current counts form a window of `unknown + 1` values
/// starting at `current_on`; the transition prunes the window, and the
/// surviving offsets are rebased onto the stable count.
fn options_for_counts(
    current_state: bool,
    next_state: bool,
    current_on: u32,
    unknown: u32,
    stable_on: u32,
) -> StableOptions {
    let mut current_mask: u32 = (1 << 9) - 1;
    current_mask &= ((1u32 << (unknown + 1)) - 1) << current_on;

    current_mask &= match (current_state, next_state) {
        (false, false) => 0b111110111,
        (false, true) => 0b000001000,
        (true, false) => 0b111110011,
        (true, true) => 0b000001100,
    };

    let stable_mask = (current_mask >> current_on) << stable_on;
    StableOptions::for_counts(stable_mask)
}

/// The block-plus-diagonal-sparks signature of an eater2 in action: a 2×2
/// block whose corners saw exactly the tell-tale activity.
fn contains_eater2(stable: &BitBoard, ever_active: &BitBoard) -> bool {
    let mut block_match = BitBoard::new();
    for i in 0..N {
        let next = (i + 1) % N;
        block_match[i] = stable[i]
            & stable[i].rotate_right(1)
            & stable[next]
            & stable[next].rotate_right(1);
    }

    let should_be_active: Vec<BitBoard> = [
        ("bo$o!", 1, 1),
        ("o$bo!", -1, 1),
        ("bo$o!", -1, -1),
        ("o$bo!", 1, -1),
    ]
    .iter()
    .map(|&(pattern, dx, dy)| rle::parse_plain(pattern, dx, dy).unwrap())
    .collect();
    let should_not_be_active: Vec<BitBoard> = [
        ("2bo2$obo!", 0, 0),
        ("o2$obo!", -1, 0),
        ("obo2$o!", -1, -1),
        ("obo2$2bo!", 0, -1),
    ]
    .iter()
    .map(|&(pattern, dx, dy)| rle::parse_plain(pattern, dx, dy).unwrap())
    .collect();

    for corner in block_match.cells() {
        for k in 0..4 {
            let wanted = should_be_active[k].translate(corner.0, corner.1);
            let unwanted = should_not_be_active[k].translate(corner.0, corner.1);
            if ever_active.contains(&wanted) && ever_active.are_disjoint(&unwanted) {
                return true;
            }
        }
    }
    false
}

/// Evolves the starting pattern over the solved background and checks the
/// filter at its generation.
fn passes_filter(params: &SearchParams, solution: &Solution) -> bool {
    let Some(filter) = &params.filter else {
        return true;
    };

    let mut state = params.starting_state;
    state.transfer_stable(&solution.stable);

    let mut passed = false;
    for i in 0..filter.gen {
        state = state.step_maintaining(&solution.stable);
        if i < solution.interaction_gen {
            continue;
        }
        if !(state.unknown & filter.mask).is_empty() {
            break;
        }
        if i + 1 == filter.gen && ((state.state ^ filter.pattern) & filter.mask).is_empty() {
            passed = true;
        }
    }
    passed
}

fn print_solution(solution: &Solution) {
    println!("Winner:");
    println!("x = 0, y = 0, rule = LifeBellman");
    println!(
        "{}",
        rle::life_bellman_rle(
            &solution.state,
            &(solution.stable.unknown | solution.stable.state)
        )
    );

    if !solution.completed.is_empty() {
        println!("Completed Plain:");
        println!("{}", rle::plain_rle(&(solution.state | solution.completed)));
    } else {
        println!("Completion Failed!");
        println!("{}", rle::plain_rle(&BitBoard::new()));
    }
}
