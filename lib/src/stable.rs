//! The stable-state solver.
//!
//! Every cell of the background must end up in a still life. For a live
//! cell that means 2 or 3 live neighbours; for a dead cell any count except
//! 3, and also excepting 7 and 8, which cannot occur next to stable live
//! cells. That gives eight per-cell possibilities, tracked as eight
//! *ruled-out* bit planes: a zero bit means the option is still open.
//!
//! Propagation is a fixpoint of three passes. [`propagate_simple`] deduces
//! directly from known cells, [`update_options`] narrows the option planes
//! from the neighbour-count intervals, and [`signal_neighbours`] forces
//! whole neighbourhoods when only one count remains achievable. All three
//! are bit-sliced: the per-cell condition "count k is achievable" is the
//! interval test `known-on ≤ k ≤ known-on + unknown`, evaluated for a whole
//! column of cells at a time on the planes of a [`NeighbourCount`]. The
//! kernels are validated against brute-force neighbourhood enumeration in
//! the test suite.
//!
//! [`propagate_simple`]: LifeStable::propagate_simple
//! [`update_options`]: LifeStable::update_options
//! [`signal_neighbours`]: LifeStable::signal_neighbours

use crate::{
    board::{BitBoard, Cell, N},
    count::{column_count, NeighbourCount, Nibble},
    rle,
};
use bitflags::bitflags;
use std::time::{Duration, Instant};

bitflags! {
    /// The still-life-compatible local configurations a cell may still take.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct StableOptions: u8 {
        /// Live with two live neighbours.
        const LIVE2 = 1 << 0;
        /// Live with three live neighbours.
        const LIVE3 = 1 << 1;
        /// Dead with no live neighbours.
        const DEAD0 = 1 << 2;
        /// Dead with one live neighbour.
        const DEAD1 = 1 << 3;
        /// Dead with two live neighbours.
        const DEAD2 = 1 << 4;
        /// Dead with four live neighbours.
        const DEAD4 = 1 << 5;
        /// Dead with five live neighbours.
        const DEAD5 = 1 << 6;
        /// Dead with six live neighbours.
        const DEAD6 = 1 << 7;

        /// Any live option.
        const LIVE = Self::LIVE2.bits() | Self::LIVE3.bits();
        /// Any dead option.
        const DEAD = Self::DEAD0.bits()
            | Self::DEAD1.bits()
            | Self::DEAD2.bits()
            | Self::DEAD4.bits()
            | Self::DEAD6.bits()
            | Self::DEAD5.bits();
    }
}

/// `(live, neighbour count)` of each option, in bit order.
pub(crate) const OPTIONS: [(bool, u32); 8] = [
    (true, 2),
    (true, 3),
    (false, 0),
    (false, 1),
    (false, 2),
    (false, 4),
    (false, 5),
    (false, 6),
];

impl StableOptions {
    /// The options whose neighbour count appears in `countmask` (bit `k`
    /// set ⇒ count `k` allowed).
    pub fn for_counts(countmask: u32) -> Self {
        let mut result = Self::empty();
        for (i, &(_, k)) in OPTIONS.iter().enumerate() {
            if countmask >> k & 1 != 0 {
                result |= Self::from_bits_retain(1 << i);
            }
        }
        result
    }
}

/// The outcome of a propagation pass.
///
/// An inconsistent result means the current branch admits no still life;
/// this is ordinary control flow for the search, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropagateResult {
    /// Whether the state still admits a completion.
    pub consistent: bool,
    /// Whether the pass learned anything new.
    pub changed: bool,
}

impl PropagateResult {
    pub(crate) const CONTRADICTION: Self = PropagateResult {
        consistent: false,
        changed: false,
    };

    fn ok(changed: bool) -> Self {
        PropagateResult {
            consistent: true,
            changed,
        }
    }
}

/// The three-valued still-life state: per-cell option planes plus the
/// derived caches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LifeStable {
    /// Per-option exclusion planes; bit set ⇒ the option is ruled out.
    ruled_out: [BitBoard; 8],
    /// Cells known to be on.
    pub state: BitBoard,
    /// Cells whose value is still undetermined.
    pub unknown: BitBoard,
    /// A monotonically growing superset of `state.zoi()`: wherever the
    /// active pattern has been perturbed there must eventually be a live
    /// stable cell nearby, even before we know which one.
    pub state_zoi: BitBoard,
}

/// A fresh state knows nothing: every option is open and every cell is
/// unknown.
impl Default for LifeStable {
    fn default() -> Self {
        LifeStable {
            ruled_out: [BitBoard::new(); 8],
            state: BitBoard::new(),
            unknown: BitBoard::full(),
            state_zoi: BitBoard::new(),
        }
    }
}

impl LifeStable {
    /// A fully unknown board.
    pub fn new() -> Self {
        Self::default()
    }

    /// The options still open at `cell`.
    pub fn get_options(&self, cell: Cell) -> StableOptions {
        let mut result = StableOptions::empty();
        for (i, plane) in self.ruled_out.iter().enumerate() {
            if !plane.get(cell) {
                result |= StableOptions::from_bits_retain(1 << i);
            }
        }
        result
    }

    /// Rules out every option at `cell` not present in `options`.
    pub fn restrict_options(&mut self, cell: Cell, options: StableOptions) {
        for (i, plane) in self.ruled_out.iter_mut().enumerate() {
            if !options.contains(StableOptions::from_bits_retain(1 << i)) {
                plane.set(cell);
            }
        }
    }

    /// Fixes every cell of `which` to on.
    pub fn set_on(&mut self, which: &BitBoard) {
        self.state |= *which;
        self.state_zoi |= which.zoi();
        self.unknown &= !*which;
        for (plane, &(live, _)) in self.ruled_out.iter_mut().zip(&OPTIONS) {
            if !live {
                *plane |= *which;
            }
        }
    }

    /// Fixes every cell of `which` to off.
    pub fn set_off(&mut self, which: &BitBoard) {
        self.state &= !*which;
        self.unknown &= !*which;
        for (plane, &(live, _)) in self.ruled_out.iter_mut().zip(&OPTIONS) {
            if live {
                *plane |= *which;
            }
        }
    }

    /// Fixes a single cell to on.
    pub fn set_cell_on(&mut self, cell: Cell) {
        self.set_on(&BitBoard::cell(cell));
    }

    /// Fixes a single cell to off.
    pub fn set_cell_off(&mut self, cell: Cell) {
        self.set_off(&BitBoard::cell(cell));
    }

    /// Cells where at least one option has been excluded but the value is
    /// still open.
    pub fn perturbed_unknowns(&self) -> BitBoard {
        let mut touched = BitBoard::new();
        for plane in &self.ruled_out {
            touched |= *plane;
        }
        touched & self.unknown
    }

    /// Unknown cells already narrowed to one live and one dead count
    /// option: the first candidates worth probing.
    pub fn vulnerable(&self) -> BitBoard {
        let live_single = self.ruled_out[0] ^ self.ruled_out[1];

        let mut seen = BitBoard::new();
        let mut twice = BitBoard::new();
        for plane in &self.ruled_out[2..] {
            let remaining = !*plane;
            twice |= seen & remaining;
            seen |= remaining;
        }
        let dead_single = seen & !twice;

        live_single & dead_single & self.unknown
    }

    /// Cells at which `self` and `other` hold different knowledge.
    pub fn differences(&self, other: &LifeStable) -> BitBoard {
        let mut result = (self.state ^ other.state) | (self.unknown ^ other.unknown);
        for (a, b) in self.ruled_out.iter().zip(&other.ruled_out) {
            result |= *a ^ *b;
        }
        result
    }

    /// One pass of direct deduction from known cells only.
    fn propagate_simple_step(&mut self) -> PropagateResult {
        let start_unknown = self.unknown;
        let on_count = NeighbourCount::new(&self.state);
        let unk_count = NeighbourCount::new(&self.unknown);

        let mut new_off = BitBoard::new();
        let mut new_on = BitBoard::new();
        let mut sig_off = BitBoard::new();
        let mut sig_on = BitBoard::new();
        let mut abort = 0u64;

        for i in 0..N {
            let signals = simple_kernel(
                on_count.column(i),
                unk_count.column(i),
                self.state[i],
                self.unknown[i],
            );
            new_off[i] = signals.set_off & self.unknown[i];
            new_on[i] = signals.set_on & self.unknown[i];
            sig_off[i] = signals.signal_off;
            sig_on[i] = signals.signal_on;
            abort |= signals.abort;
        }

        if abort != 0 {
            return PropagateResult::CONTRADICTION;
        }

        self.state |= new_on;
        self.unknown &= !(new_on | new_off);

        let off_zoi = sig_off.zoi() & !sig_off;
        let on_zoi = sig_on.zoi() & !sig_on;
        if !(off_zoi & on_zoi & self.unknown).is_empty() {
            return PropagateResult::CONTRADICTION;
        }
        self.state |= on_zoi & self.unknown;
        self.unknown &= !(on_zoi | off_zoi);

        PropagateResult::ok(self.unknown != start_unknown)
    }

    /// These deductions only need `state` and `unknown`; run them to a
    /// fixed point and then refresh the option planes.
    pub fn propagate_simple(&mut self) -> PropagateResult {
        let mut changed = false;
        loop {
            let result = self.propagate_simple_step();
            if !result.consistent {
                return PropagateResult::CONTRADICTION;
            }
            changed |= result.changed;
            if !result.changed {
                break;
            }
        }

        self.state_zoi |= self.state.zoi();

        if changed && !self.stabilise_options().consistent {
            return PropagateResult::CONTRADICTION;
        }
        PropagateResult::ok(changed)
    }

    /// Reconciles the `state`/`unknown` caches with the option planes, in
    /// both directions.
    pub fn synchronise_state_known(&mut self) -> PropagateResult {
        let known_on = !self.unknown & self.state;
        let known_off = !self.unknown & !self.state;
        for (plane, &(live, _)) in self.ruled_out.iter_mut().zip(&OPTIONS) {
            *plane |= if live { known_off } else { known_on };
        }

        let maybe_live = !(self.ruled_out[0] & self.ruled_out[1]);
        let mut all_dead_ruled = BitBoard::full();
        for plane in &self.ruled_out[2..] {
            all_dead_ruled &= *plane;
        }
        let maybe_dead = !all_dead_ruled;

        if !(!maybe_live & !maybe_dead).is_empty() {
            return PropagateResult::CONTRADICTION;
        }

        let mut changes = !self.state & (maybe_live & !maybe_dead);
        self.state = maybe_live & !maybe_dead;

        changes |= !self.state_zoi & self.state.zoi();
        self.state_zoi |= self.state.zoi();

        changes |= !self.unknown & (maybe_live & maybe_dead);
        self.unknown = maybe_live & maybe_dead;

        PropagateResult::ok(!changes.is_empty())
    }

    /// The single-cell counterpart of
    /// [`synchronise_state_known`](Self::synchronise_state_known).
    pub fn update_cell_known(&mut self, cell: Cell) {
        let options = self.get_options(cell);
        let maybe_live = options.intersects(StableOptions::LIVE);
        let maybe_dead = options.intersects(StableOptions::DEAD);
        self.state.put(cell, maybe_live && !maybe_dead);
        self.unknown.put(cell, maybe_live && maybe_dead);
        if maybe_live && !maybe_dead {
            self.state_zoi |= BitBoard::cell_zoi(cell);
        }
    }

    /// Excludes every option whose neighbour count lies outside the
    /// interval currently achievable around the cell.
    pub fn update_options(&mut self) -> PropagateResult {
        let on_count = NeighbourCount::new(&self.state);
        let unk_count = NeighbourCount::new(&self.unknown);

        let mut changes = 0u64;
        for i in 0..N {
            let excluded = options_kernel(on_count.column(i), unk_count.column(i));
            for (plane, word) in self.ruled_out.iter_mut().zip(excluded) {
                changes |= word & !plane[i];
                plane[i] |= word;
            }
        }
        PropagateResult::ok(changes != 0)
    }

    /// Where only a single achievable neighbour count remains, forces all
    /// the unknown neighbours that realise it.
    pub fn signal_neighbours(&mut self) -> PropagateResult {
        let on_count = NeighbourCount::new(&self.state);
        let unk_count = NeighbourCount::new(&self.unknown);

        let mut sig_off = BitBoard::new();
        let mut sig_on = BitBoard::new();
        for i in 0..N {
            let ruled = self.ruled_out_column_words(i);
            let (off, on) = signal_kernel(ruled, on_count.column(i), unk_count.column(i));
            sig_off[i] = off;
            sig_on[i] = on;
        }

        self.apply_signals(&sig_off, &sig_on)
    }

    pub(crate) fn ruled_out_column_words(&self, i: usize) -> [u64; 8] {
        let mut result = [0; 8];
        for (word, plane) in result.iter_mut().zip(&self.ruled_out) {
            *word = plane[i];
        }
        result
    }

    fn apply_signals(&mut self, sig_off: &BitBoard, sig_on: &BitBoard) -> PropagateResult {
        let off_zoi = sig_off.zoi() & !*sig_off;
        let on_zoi = sig_on.zoi() & !*sig_on;

        if !(off_zoi & on_zoi & self.unknown).is_empty() {
            return PropagateResult::CONTRADICTION;
        }

        let new_off = off_zoi & self.unknown;
        let new_on = on_zoi & self.unknown;
        let changed = !(new_off | new_on).is_empty();
        self.set_off(&new_off);
        self.set_on(&new_on);
        PropagateResult::ok(changed)
    }

    /// Alternates cache synchronisation and option narrowing to a fixed
    /// point.
    pub fn stabilise_options(&mut self) -> PropagateResult {
        let mut changed_ever = false;
        loop {
            let known = self.synchronise_state_known();
            if !known.consistent {
                return PropagateResult::CONTRADICTION;
            }
            let options = self.update_options();
            if !options.consistent {
                return PropagateResult::CONTRADICTION;
            }
            if !known.changed && !options.changed {
                return PropagateResult::ok(changed_ever);
            }
            changed_ever = true;
        }
    }

    fn propagate_step(&mut self) -> PropagateResult {
        let stabilise = self.stabilise_options();
        if !stabilise.consistent {
            return PropagateResult::CONTRADICTION;
        }
        let signal = self.signal_neighbours();
        if !signal.consistent {
            return PropagateResult::CONTRADICTION;
        }
        PropagateResult::ok(stabilise.changed || signal.changed)
    }

    /// Full propagation to a fixed point.
    pub fn propagate(&mut self) -> PropagateResult {
        let simple = self.propagate_simple();
        if !simple.consistent {
            return PropagateResult::CONTRADICTION;
        }
        let mut changed_ever = simple.changed;

        loop {
            let result = self.propagate_step();
            if !result.consistent {
                return PropagateResult::CONTRADICTION;
            }
            changed_ever |= result.changed;
            if !result.changed {
                break;
            }
        }

        // One more cache refresh after the last neighbour signalling.
        if changed_ever && !self.stabilise_options().consistent {
            return PropagateResult::CONTRADICTION;
        }
        PropagateResult::ok(changed_ever)
    }

    /// Propagation confined to a five-column strip, for use after a single
    /// branch commit.
    pub fn propagate_strip(&mut self, column: i32) -> PropagateResult {
        let center = column.rem_euclid(N as i32) as usize;
        let mut cols = [0usize; 5];
        for (k, c) in cols.iter_mut().enumerate() {
            *c = (center + N - 2 + k) % N;
        }

        let mut changed_ever = false;
        loop {
            let sync = self.synchronise_state_known();
            if !sync.consistent {
                return PropagateResult::CONTRADICTION;
            }
            let mut changed = sync.changed;

            let mut sig_off = BitBoard::new();
            let mut sig_on = BitBoard::new();
            let mut option_changes = 0u64;
            for &c in &cols {
                let on = column_count(&self.state, c);
                let unk = column_count(&self.unknown, c);
                let excluded = options_kernel(on, unk);
                for (plane, word) in self.ruled_out.iter_mut().zip(excluded) {
                    option_changes |= word & !plane[c];
                    plane[c] |= word;
                }
                let (off, on_sig) = signal_kernel(self.ruled_out_column_words(c), on, unk);
                sig_off[c] = off;
                sig_on[c] = on_sig;
            }
            changed |= option_changes != 0;

            let signals = self.apply_signals(&sig_off, &sig_on);
            if !signals.consistent {
                return PropagateResult::CONTRADICTION;
            }
            changed |= signals.changed;

            changed_ever |= changed;
            if !changed {
                return PropagateResult::ok(changed_ever);
            }
        }
    }

    /// Probes each cell both ways and keeps whatever both branches agree
    /// on; a cell with both branches contradictory kills the whole state.
    pub fn test_unknowns(&mut self, cells: &BitBoard) -> PropagateResult {
        let mut remaining = *cells & self.unknown;
        let mut changed = false;

        while let Some(cell) = remaining.first_on() {
            remaining.erase(cell);

            let mut on_search = self.clone();
            on_search.set_cell_on(cell);
            let on_result = on_search.propagate();

            let mut off_search = self.clone();
            off_search.set_cell_off(cell);
            let off_result = off_search.propagate();

            match (on_result.consistent, off_result.consistent) {
                (false, false) => return PropagateResult::CONTRADICTION,
                (true, false) => {
                    *self = on_search;
                    changed = true;
                }
                (false, true) => {
                    *self = off_search;
                    changed = true;
                }
                (true, true) => {
                    if on_result.changed && off_result.changed {
                        let agreement = self.unknown
                            & !on_search.unknown
                            & !off_search.unknown
                            & !(on_search.state ^ off_search.state);
                        if !agreement.is_empty() {
                            self.set_on(&(agreement & on_search.state));
                            self.set_off(&(agreement & !on_search.state));
                            changed = true;
                        }
                    }
                }
            }

            remaining &= self.unknown;
        }

        if changed {
            PropagateResult {
                consistent: self.propagate().consistent,
                changed: true,
            }
        } else {
            PropagateResult::ok(false)
        }
    }

    fn complete_step(
        &mut self,
        deadline: Instant,
        minimise: bool,
        max_pop: &mut u32,
        best: &mut BitBoard,
    ) -> bool {
        if Instant::now() > deadline {
            return false;
        }

        if !self.propagate().consistent {
            return false;
        }

        if self.state.population() >= *max_pop {
            return false;
        }

        if !self.test_unknowns(&(self.state_zoi & self.unknown)).consistent {
            return false;
        }
        if self.state.population() >= *max_pop {
            return false;
        }

        let settable = self.perturbed_unknowns();
        if settable.is_empty() {
            *best = self.state;
            *max_pop = self.state.population();
            return true;
        }

        // Guess cells with few unknown neighbours first.
        let unk_count = NeighbourCount::new(&self.unknown);
        let few = !unk_count.bit3 & !unk_count.bit2 & unk_count.bit1;
        let placement = (settable & few & !unk_count.bit0)
            .first_on()
            .or_else(|| (settable & few & unk_count.bit0).first_on())
            .or_else(|| settable.first_on());
        let Some(placement) = placement else {
            return false;
        };

        let mut off_search = self.clone();
        off_search.set_cell_off(placement);
        let off_result = off_search.complete_step(deadline, minimise, max_pop, best);
        if off_result && !minimise {
            return true;
        }

        self.set_cell_on(placement);
        let on_result = self.complete_step(deadline, minimise, max_pop, best);

        off_result || on_result
    }

    /// Searches for a concrete still life extending `state`, preferring
    /// small ones, within a wall-clock budget. Returns the empty board on
    /// timeout or failure.
    pub fn complete_stable(&self, timeout: Duration, minimise: bool) -> BitBoard {
        if self.unknown.is_empty() {
            return self.state;
        }

        let mut best = BitBoard::new();
        let mut max_pop = u32::MAX;
        let mut search_area = self.state;
        let deadline = Instant::now() + timeout;

        while !(self.unknown & !search_area).is_empty() {
            search_area = search_area.zoi();
            let mut copy = self.clone();
            copy.unknown &= search_area;
            copy.complete_step(deadline, minimise, &mut max_pop, &mut best);

            if best.population() > 0 || Instant::now() > deadline {
                break;
            }
        }
        best
    }

    /// The LifeBellman rendering: known cells plus the unknown region.
    pub fn bellman_rle(&self) -> String {
        rle::life_bellman_rle(&self.state, &(self.unknown | self.state))
    }
}

struct SimpleSignals {
    set_off: u64,
    set_on: u64,
    signal_off: u64,
    signal_on: u64,
    abort: u64,
}

/// Still-life deductions from the known neighbour counts of one column.
///
/// The achievable neighbour counts of a cell form the interval
/// `[on, on + unk]`; a live cell needs the interval to meet {2, 3}, a dead
/// cell must be able to avoid {3, 7, 8}. Signals force *all* unknown
/// neighbours at once and only fire when a single achievable count
/// survives.
fn simple_kernel(on: Nibble, unk: Nibble, cell_on: u64, cell_unknown: u64) -> SimpleSignals {
    let upper = on.add(unk);
    let live2 = on.le_const(2) & upper.ge_const(2);
    let live3 = on.le_const(3) & upper.ge_const(3);
    let live_ok = live2 | live3;
    let dead_impossible = (on.eq_const(3) & unk.eq_const(0)) | on.ge_const(7);

    let known_off = !cell_on & !cell_unknown;
    let set_off = cell_unknown & !live_ok;
    let set_on = cell_unknown & dead_impossible;
    let abort = (cell_on & !live_ok) | (known_off & dead_impossible) | (set_off & set_on);

    let eff_on = cell_on | set_on;
    let eff_off = known_off | set_off;

    let has_unknown = !unk.eq_const(0);
    let signal_on = has_unknown
        & ((eff_on & upper.eq_const(2)) | (eff_off & on.eq_const(3) & unk.eq_const(1)));
    let signal_off = has_unknown
        & ((eff_on & on.eq_const(3))
            | (eff_off & ((on.eq_const(2) & unk.eq_const(1)) | on.eq_const(6))));

    SimpleSignals {
        set_off,
        set_on,
        signal_off,
        signal_on,
        abort,
    }
}

/// Exclusion words per option: an option is unreachable when its count
/// lies outside `[on, on + unk]`.
fn options_kernel(on: Nibble, unk: Nibble) -> [u64; 8] {
    let upper = on.add(unk);
    let mut result = [0; 8];
    for (word, &(_, k)) in result.iter_mut().zip(&OPTIONS) {
        let below = on.ge_const(k + 1);
        let above = if k == 0 { 0 } else { upper.le_const(k - 1) };
        *word = below | above;
    }
    result
}

/// Neighbour forcing from the option planes: when the only achievable
/// still-open count is the top (bottom) of the interval, every unknown
/// neighbour must be on (off).
fn signal_kernel(ruled: [u64; 8], on: Nibble, unk: Nibble) -> (u64, u64) {
    let upper = on.add(unk);

    let possible = |k: u32| -> u64 {
        let mut word = 0;
        for (ruled_word, &(_, count)) in ruled.iter().zip(&OPTIONS) {
            if count == k {
                word |= !ruled_word;
            }
        }
        word
    };

    let mut any = 0;
    let mut non_top = 0;
    let mut non_bot = 0;
    for k in 0..=6 {
        let achievable = possible(k) & on.le_const(k) & upper.ge_const(k);
        any |= achievable;
        non_top |= achievable & !upper.eq_const(k);
        non_bot |= achievable & !on.eq_const(k);
    }

    let has_unknown = !unk.eq_const(0);
    let signal_on = any & !non_top & has_unknown;
    let signal_off = any & !non_bot & has_unknown;
    (signal_off, signal_on)
}

#[cfg(test)]
mod test {
    use super::*;

    /// The `(value, count)` pairs a cell can realise locally.
    fn local_completions(cell: Option<bool>, on: u32, unk: u32) -> Vec<(bool, u32)> {
        let values = match cell {
            Some(v) => vec![v],
            None => vec![false, true],
        };
        let mut result = Vec::new();
        for v in values {
            for c in on..=on + unk {
                let allowed = if v { c == 2 || c == 3 } else { c != 3 && c <= 6 };
                if allowed {
                    result.push((v, c));
                }
            }
        }
        result
    }

    /// Checks every kernel against brute-force enumeration of the
    /// neighbourhood, over all counts and cell states.
    #[test]
    fn kernels_sound_against_brute_force() {
        for cell in [Some(true), Some(false), None] {
            for on in 0..=8u32 {
                for unk in 0..=8 - on {
                    let valid = local_completions(cell, on, unk);
                    let on_n = Nibble::splat(on);
                    let unk_n = Nibble::splat(unk);
                    let cell_on = if cell == Some(true) { !0 } else { 0 };
                    let cell_unknown = if cell.is_none() { !0 } else { 0 };

                    let signals = simple_kernel(on_n, unk_n, cell_on, cell_unknown);
                    let context = format!("cell {cell:?}, on {on}, unk {unk}");

                    assert_eq!(signals.abort != 0, valid.is_empty(), "abort: {context}");
                    if signals.set_off != 0 {
                        assert!(valid.iter().all(|&(v, _)| !v), "set_off: {context}");
                    }
                    if signals.set_on != 0 {
                        assert!(valid.iter().all(|&(v, _)| v), "set_on: {context}");
                    }
                    if signals.signal_on != 0 && signals.abort == 0 {
                        assert!(unk > 0, "signal_on without unknowns: {context}");
                        assert!(
                            valid.iter().all(|&(_, c)| c == on + unk),
                            "signal_on: {context}"
                        );
                    }
                    if signals.signal_off != 0 && signals.abort == 0 {
                        assert!(unk > 0, "signal_off without unknowns: {context}");
                        assert!(valid.iter().all(|&(_, c)| c == on), "signal_off: {context}");
                    }

                    let excluded = options_kernel(on_n, unk_n);
                    for (word, &(_, k)) in excluded.iter().zip(&OPTIONS) {
                        assert_eq!(
                            *word != 0,
                            k < on || k > on + unk,
                            "option {k}: {context}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn signal_kernel_forces_extremes() {
        // A live cell with three known neighbours: every unknown must stay
        // off.
        let mut ruled = [0u64; 8];
        for (word, &(live, _)) in ruled.iter_mut().zip(&OPTIONS) {
            if !live {
                *word = !0;
            }
        }
        let (off, on) = signal_kernel(ruled, Nibble::splat(3), Nibble::splat(2));
        assert_eq!(off, !0);
        assert_eq!(on, 0);

        // A dead cell with two known neighbours and one unknown: switching
        // the unknown on would give birth.
        let mut ruled = [0u64; 8];
        ruled[0] = !0;
        ruled[1] = !0;
        let (off, on) = signal_kernel(ruled, Nibble::splat(2), Nibble::splat(1));
        assert_eq!(off, !0);
        assert_eq!(on, 0);

        // A live cell that can only reach two neighbours by turning every
        // unknown on.
        let mut ruled = [0u64; 8];
        for (word, &(live, _)) in ruled.iter_mut().zip(&OPTIONS) {
            if !live {
                *word = !0;
            }
        }
        let (off, on) = signal_kernel(ruled, Nibble::splat(0), Nibble::splat(2));
        assert_eq!(off, 0);
        assert_eq!(on, !0);
    }

    /// A block with one corner unknown: propagation must place the corner.
    #[test]
    fn propagate_completes_block_corner() {
        let mut stable = LifeStable::new();
        let mut block = BitBoard::new();
        block.set((10, 10));
        block.set((11, 10));
        block.set((10, 11));
        let corner = BitBoard::cell((11, 11));

        stable.set_off(&!(block | corner));
        stable.set_on(&block);

        let result = stable.propagate();
        assert!(result.consistent);
        assert!(stable.state.get((11, 11)));
        assert!(stable.unknown.is_empty());

        // A fully specified stable state is a still life.
        assert_eq!(stable.state.step(), stable.state);

        // Propagation is idempotent.
        let again = stable.propagate();
        assert!(again.consistent);
        assert!(!again.changed);
    }

    /// Three live cells in a row with everything else off cannot be a
    /// still life.
    #[test]
    fn propagate_rejects_blinker() {
        let mut stable = LifeStable::new();
        let mut row = BitBoard::new();
        for x in 10..13 {
            row.set((x, 10));
        }
        stable.set_off(&!row);
        stable.set_on(&row);
        assert!(!stable.propagate().consistent);
    }

    /// Option sets only ever shrink under propagation.
    #[test]
    fn options_monotone() {
        let mut stable = LifeStable::new();
        let mut block = BitBoard::new();
        block.set((10, 10));
        block.set((11, 10));
        stable.set_on(&block);
        stable.set_off(&!block.big_zoi());

        let before: Vec<StableOptions> = (0..N as i32)
            .flat_map(|x| (0..64).map(move |y| (x, y)))
            .map(|cell| stable.get_options(cell))
            .collect();

        assert!(stable.propagate().consistent);

        for (i, cell) in (0..N as i32)
            .flat_map(|x| (0..64i32).map(move |y| (x, y)))
            .enumerate()
        {
            assert!(
                before[i].contains(stable.get_options(cell)),
                "options grew at {cell:?}"
            );
        }
    }

    #[test]
    fn test_unknowns_forces_corner() {
        let mut stable = LifeStable::new();
        let mut block = BitBoard::new();
        block.set((10, 10));
        block.set((11, 10));
        block.set((10, 11));
        let corner = BitBoard::cell((11, 11));
        stable.set_off(&!(block | corner));
        stable.set_on(&block);

        let result = stable.test_unknowns(&corner);
        assert!(result.consistent);
        assert!(stable.state.get((11, 11)));
    }

    #[test]
    fn complete_stable_extends_partial_block() {
        let mut stable = LifeStable::new();
        let mut known = BitBoard::new();
        known.set((10, 10));
        known.set((11, 10));
        stable.set_on(&known);
        stable.set_off(&!known.big_zoi());

        let completed = stable.complete_stable(Duration::from_secs(5), true);
        assert!(!completed.is_empty());
        assert!(completed.contains(&known));
        assert_eq!(completed.step(), completed);
    }

    #[test]
    fn vulnerable_narrowed_cell() {
        let mut stable = LifeStable::new();
        let cell = (20, 20);
        stable.restrict_options(cell, StableOptions::LIVE2 | StableOptions::DEAD1);
        assert!(stable.vulnerable().get(cell));
        assert_eq!(stable.vulnerable().population(), 1);
    }

    /// Strip propagation around a committed column reaches the same
    /// conclusion as the full pass for a local deduction.
    #[test]
    fn propagate_strip_completes_block_corner() {
        let mut stable = LifeStable::new();
        let mut block = BitBoard::new();
        block.set((10, 10));
        block.set((11, 10));
        block.set((10, 11));
        let corner = BitBoard::cell((11, 11));

        stable.set_off(&!(block | corner));
        stable.set_on(&block);

        let result = stable.propagate_strip(11);
        assert!(result.consistent);
        assert!(result.changed);
        assert!(stable.state.get((11, 11)));

        // A second strip pass has nothing left to do.
        let again = stable.propagate_strip(11);
        assert!(again.consistent);
        assert!(!again.changed);
    }

    /// Re-restricting to the same options is a no-op.
    #[test]
    fn restrict_options_idempotent() {
        let mut stable = LifeStable::new();
        let cell = (15, 15);
        stable.restrict_options(cell, StableOptions::LIVE | StableOptions::DEAD2);
        let snapshot = stable.clone();
        stable.restrict_options(cell, StableOptions::LIVE | StableOptions::DEAD2);
        assert_eq!(stable, snapshot);
    }
}
