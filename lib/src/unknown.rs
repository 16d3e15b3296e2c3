//! The three-valued transient state.
//!
//! While the stable background is being solved, the evolving configuration
//! is tracked with three values per cell: on, off, or unknown. Unknown
//! cells carry one extra bit, *unknown-stable*, meaning "whatever the
//! stable background turns out to be here". That extra bit is what lets a
//! quiescent region stay symbolic instead of dissolving into plain
//! unknowns after one step.
//!
//! [`step_maintaining`](LifeUnknown::step_maintaining) advances one
//! generation in three passes, all bit-sliced:
//!
//! 1. a naive three-valued Life step from the interval of achievable
//!    neighbour counts;
//! 2. a *restore* pass: cells whose neighbourhood is locally identical to
//!    the stable background snap back to it, keeping unknown-stable cells
//!    symbolic;
//! 3. a *refined* pass away from transient unknowns: there, every unknown
//!    neighbour equals its stable value, so the current count is the
//!    stable count shifted by the known difference δ, and the cell's
//!    stable options decide the next value option by option.

use crate::{
    board::{BitBoard, Cell, N},
    count::{column_count, NeighbourCount, Nibble},
    stable::{LifeStable, OPTIONS},
    transition::Transition,
};

/// A three-valued configuration of the board.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LifeUnknown {
    /// Cells known on.
    pub state: BitBoard,
    /// Cells of undetermined value.
    pub unknown: BitBoard,
    /// Unknown cells known to equal the stable background.
    pub unknown_stable: BitBoard,
}

impl LifeUnknown {
    /// Advances one generation, keeping as much knowledge as the stable
    /// state allows.
    #[must_use]
    pub fn step_maintaining(&self, stable: &LifeStable) -> LifeUnknown {
        let state_count = NeighbourCount::new(&self.state);
        let unknown_count = NeighbourCount::new(&self.unknown);
        let stable_count = NeighbourCount::new(&stable.state);

        let near_unstable = (self.unknown & !self.unknown_stable).zoi();
        let different_count = state_count.bit3
            | (state_count.bit2 ^ stable_count.bit2)
            | (state_count.bit1 ^ stable_count.bit1)
            | (state_count.bit0 ^ stable_count.bit0);
        let restorable = !((self.state ^ stable.state) | near_unstable | different_count);
        let mut refineable = !(restorable | near_unstable);

        let mut result = LifeUnknown::default();
        for i in 0..N {
            let (next_on, next_unknown) = naive_kernel(
                state_count.column(i),
                unknown_count.column(i),
                self.state[i],
                self.unknown[i],
            );

            let to_restore = restorable[i] & next_unknown;
            result.state[i] = (next_on & !to_restore) | (stable.state[i] & to_restore);
            result.unknown[i] = (next_unknown & !to_restore) | (stable.unknown[i] & to_restore);
            result.unknown_stable[i] = stable.unknown[i] & to_restore;
            refineable[i] &= result.unknown[i] & !result.unknown_stable[i];
        }

        if refineable.is_empty() {
            return result;
        }

        for i in 0..N {
            let mask = refineable[i];
            if mask == 0 {
                continue;
            }
            let m = stable_count.sub_column(&state_count, i);
            let (next_on, next_unknown, next_unknown_stable) = refined_kernel(
                stable.ruled_out_column_words(i),
                m,
                self.state[i],
                self.unknown[i],
            );
            result.state[i] = (result.state[i] & !mask) | (next_on & mask);
            result.unknown[i] = (result.unknown[i] & !mask) | (next_unknown & mask);
            result.unknown_stable[i] =
                (result.unknown_stable[i] & !mask) | (next_unknown_stable & mask);
        }
        result
    }

    /// One column of the step, cheap enough to call per queried cell.
    ///
    /// Returns `(state, unknown, unknown_stable)` words for the column.
    pub fn step_maintaining_column(&self, stable: &LifeStable, column: i32) -> (u64, u64, u64) {
        let i = column.rem_euclid(N as i32) as usize;

        let on = column_count(&self.state, i);
        let unk = column_count(&self.unknown, i);
        let (naive_on, naive_unknown) = naive_kernel(on, unk, self.state[i], self.unknown[i]);

        let m = column_count(&stable.state, i).sub(column_count(&self.state, i));
        let (next_on, next_unknown, next_unknown_stable) = refined_kernel(
            stable.ruled_out_column_words(i),
            m,
            self.state[i],
            self.unknown[i],
        );

        let use_refined = !(self.unknown & !self.unknown_stable).zoi_column(i);
        (
            (naive_on & !use_refined) | (next_on & use_refined),
            (naive_unknown & !use_refined) | (next_unknown & use_refined),
            next_unknown_stable & use_refined,
        )
    }

    /// The step outcome for a single cell, as `(on, unknown,
    /// unknown_stable)`.
    fn step_maintaining_for(&self, stable: &LifeStable, cell: Cell) -> (bool, bool, bool) {
        let (on, unknown, unknown_stable) = self.step_maintaining_column(stable, cell.0);
        let y = cell.1.rem_euclid(64);
        (
            on >> y & 1 != 0,
            unknown >> y & 1 != 0,
            unknown_stable >> y & 1 != 0,
        )
    }

    /// Cells whose determined value differs from the determined stable
    /// value.
    pub fn active_compared_to(&self, stable: &LifeStable) -> BitBoard {
        !self.unknown & !stable.unknown & (stable.state ^ self.state)
    }

    /// Cells whose determined value flipped since `prev`.
    pub fn changes_compared_to(&self, prev: &LifeUnknown) -> BitBoard {
        (self.state ^ prev.state) & !self.unknown & !prev.unknown
    }

    /// Collapses unknown-stable cells whose stable value has since been
    /// determined.
    pub fn transfer_stable(&mut self, stable: &LifeStable) {
        let updated = self.unknown_stable & !stable.unknown;
        self.state |= stable.state & updated;
        self.unknown &= !updated;
        self.unknown_stable &= !updated;
    }

    /// Single-cell version of [`transfer_stable`](Self::transfer_stable).
    pub fn transfer_stable_cell(&mut self, stable: &LifeStable, cell: Cell) {
        if self.unknown_stable.get(cell) && !stable.unknown.get(cell) {
            if stable.state.get(cell) {
                self.state.set(cell);
            }
            self.unknown.erase(cell);
            self.unknown_stable.erase(cell);
        }
    }

    /// Sets one cell to a concrete value, or back to unknown-stable.
    pub fn set_known(&mut self, cell: Cell, value: bool, stable: bool) {
        if stable {
            self.unknown.set(cell);
            self.unknown_stable.set(cell);
        } else {
            self.state.put(cell, value);
            self.unknown.erase(cell);
            self.unknown_stable.erase(cell);
        }
    }

    /// Applies the *result* side of a committed transition to this (next)
    /// generation.
    pub fn set_transition_result(&mut self, cell: Cell, transition: Transition) {
        if transition == Transition::OFF_TO_OFF || transition == Transition::ON_TO_OFF {
            self.set_known(cell, false, false);
        } else if transition == Transition::OFF_TO_ON || transition == Transition::ON_TO_ON {
            self.set_known(cell, true, false);
        } else if transition == Transition::STABLE_TO_STABLE {
            self.set_known(cell, false, true);
        }
    }

    /// Applies the *previous* side of a committed transition to this
    /// generation.
    pub fn set_transition_prev(&mut self, cell: Cell, transition: Transition) {
        if transition == Transition::OFF_TO_OFF || transition == Transition::OFF_TO_ON {
            self.set_known(cell, false, false);
        } else if transition == Transition::ON_TO_OFF || transition == Transition::ON_TO_ON {
            self.set_known(cell, true, false);
        } else if transition == Transition::STABLE_TO_STABLE {
            self.set_known(cell, false, true);
        }
    }

    /// What the cell would do if no stable cell interfered: the plain Life
    /// step of the known state.
    pub fn unperturbed_transition_for(&self, cell: Cell) -> Transition {
        let next = self.state.step_for(cell);
        match (self.state.get(cell), next) {
            (false, false) => Transition::OFF_TO_OFF,
            (false, true) => Transition::OFF_TO_ON,
            (true, false) => Transition::ON_TO_OFF,
            (true, true) => Transition::ON_TO_ON,
        }
    }

    /// Whether committing `transition` at `cell` would interact with the
    /// stable pattern.
    pub fn transition_is_perturbation(&self, cell: Cell, transition: Transition) -> bool {
        transition != Transition::STABLE_TO_STABLE
            && transition != self.unperturbed_transition_for(cell)
    }

    /// The transitions consistent with this generation's knowledge and the
    /// maintained step.
    pub fn transitions_for(&self, stable: &LifeStable, cell: Cell) -> Transition {
        let prev_unknown = self.unknown.get(cell)
            && !(self.unknown_stable.get(cell) && !stable.unknown.get(cell));
        let prev_state = self.state.get(cell)
            || (self.unknown_stable.get(cell) && stable.state.get(cell));
        let (next_state, next_unknown, _) = self.step_maintaining_for(stable, cell);

        let mut transitions = Transition::ANY;
        if !prev_unknown {
            transitions &= if prev_state {
                Transition::ON_TO_OFF | Transition::ON_TO_ON
            } else {
                Transition::OFF_TO_OFF | Transition::OFF_TO_ON
            };
        }
        if !next_unknown {
            transitions &= if next_state {
                Transition::OFF_TO_ON | Transition::ON_TO_ON
            } else {
                Transition::OFF_TO_OFF | Transition::ON_TO_OFF
            };
        }
        transitions
    }
}

/// The plain three-valued Life step of one column.
///
/// A cell's next value is determined exactly when every achievable
/// neighbour count (and, for an unknown cell, both own values) agree on
/// the outcome.
fn naive_kernel(on: Nibble, unk: Nibble, cur_on: u64, cur_unknown: u64) -> (u64, u64) {
    let upper = on.add(unk);
    let reach2 = on.le_const(2) & upper.ge_const(2);
    let reach3 = on.le_const(3) & upper.ge_const(3);
    let all_in_23 = on.ge_const(2) & upper.le_const(3);
    let exactly3 = on.eq_const(3) & unk.eq_const(0);

    let known_off = !cur_on & !cur_unknown;
    let next_on = (cur_on & all_in_23) | (!cur_on & exactly3);
    let next_off = (cur_on & !(reach2 | reach3))
        | (known_off & !reach3)
        | (cur_unknown & !reach2 & !reach3);
    (next_on, !next_on & !next_off)
}

/// The option-refined step of one column, valid only away from transient
/// unknowns.
///
/// There every unknown neighbour equals its stable value, so for a stable
/// option with count `k` the current count is `k - m`, with `m` the sliced
/// difference between the stable and current known counts. Options whose
/// implied count leaves `[0, 8]` cannot be the real neighbourhood and drop
/// out. Known cells take a determined next value when all surviving
/// options agree; unknown(-stable) cells stay unknown but keep the
/// unknown-stable bit when every surviving option maps the cell back to
/// its stable value.
fn refined_kernel(
    ruled: [u64; 8],
    m: Nibble,
    cur_on: u64,
    cur_unknown: u64,
) -> (u64, u64, u64) {
    let positive = !m.b3;

    let mut any = 0u64;
    let mut all_on = !0u64;
    let mut all_off = !0u64;
    let mut all_stable = !0u64;

    for (ruled_word, &(live, k)) in ruled.iter().zip(&OPTIONS) {
        let unreal = (positive & m.ge_const(k + 1)) | (m.b3 & m.lt_const(k + 8));
        let active = !ruled_word & !unreal;

        let count_eq2 = m.eq_const((k as i32 - 2).rem_euclid(16) as u32);
        let count_eq3 = m.eq_const((k as i32 - 3).rem_euclid(16) as u32);
        let stable_value: u64 = if live { !0 } else { 0 };
        let cur_value = (cur_unknown & stable_value) | (!cur_unknown & cur_on);
        let next = count_eq3 | (cur_value & count_eq2);

        any |= active;
        all_on &= !active | next;
        all_off &= !active | !next;
        all_stable &= !active | !(next ^ stable_value);
    }

    let next_on = !cur_unknown & any & all_on;
    let next_off = !cur_unknown & any & all_off;
    let next_unknown = !(next_on | next_off);
    let next_unknown_stable = cur_unknown & any & all_stable;
    (next_on, next_unknown, next_unknown_stable)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::board::BitBoard;

    fn block() -> BitBoard {
        BitBoard::solid_rect(20, 20, 2, 2)
    }

    /// Builds a stable state that is known off everywhere except `on`
    /// cells and an `unknown` region.
    fn stable_with(on: &BitBoard, unknown: &BitBoard) -> LifeStable {
        let mut stable = LifeStable::new();
        stable.set_off(&!(*on | *unknown));
        stable.set_on(on);
        stable
    }

    #[test]
    fn stable_state_is_a_fixpoint() {
        let stable = stable_with(&block(), &BitBoard::new());
        let start = LifeUnknown {
            state: stable.state,
            unknown: stable.unknown,
            unknown_stable: stable.unknown,
        };
        assert_eq!(start.step_maintaining(&stable), start);
    }

    #[test]
    fn unknown_stable_region_stays_symbolic() {
        let region = BitBoard::solid_rect(30, 30, 3, 3);
        let stable = stable_with(&BitBoard::new(), &region);
        let start = LifeUnknown {
            state: BitBoard::new(),
            unknown: region,
            unknown_stable: region,
        };
        let next = start.step_maintaining(&stable);
        assert_eq!(next.unknown, region);
        assert_eq!(next.unknown_stable, region);
        assert!(next.state.is_empty());
    }

    /// Property: for every concrete completion of the unknown cells, the
    /// maintained step's known bits agree with the real Life step.
    #[test]
    fn step_sound_for_all_completions() {
        // A block with its corner and one outside cell undetermined, and a
        // glider approaching from a distance.
        let mut known_on = block();
        known_on.erase((21, 21));
        let mut unknown = BitBoard::cell((21, 21));
        unknown.set((23, 20));

        let stable = stable_with(&known_on, &unknown);
        let glider = crate::rle::parse_plain("bo$2bo$3o!", 30, 20).unwrap();

        let start = LifeUnknown {
            state: known_on | glider,
            unknown,
            unknown_stable: unknown,
        };
        let stepped = start.step_maintaining(&stable);

        let mut checked = 0;
        for assignment in 0..4u32 {
            let mut concrete = known_on | glider;
            let mut stable_concrete = known_on;
            for (bit, cell) in [(0, (21, 21)), (1, (23, 20))] {
                if assignment >> bit & 1 != 0 {
                    concrete.set(cell);
                    stable_concrete.set(cell);
                }
            }
            // Only consider completions that really are still lifes.
            if stable_concrete.step() != stable_concrete {
                continue;
            }
            checked += 1;

            let next_concrete = concrete.step();
            for x in 0..64 {
                for y in 0..64 {
                    let cell = (x, y);
                    if !stepped.unknown.get(cell) {
                        assert_eq!(
                            stepped.state.get(cell),
                            next_concrete.get(cell),
                            "known bit wrong at {cell:?} for assignment {assignment}"
                        );
                    } else if stepped.unknown_stable.get(cell) {
                        assert_eq!(
                            next_concrete.get(cell),
                            stable_concrete.get(cell),
                            "unknown-stable bit wrong at {cell:?}"
                        );
                    }
                }
            }
        }
        assert!(checked > 0);
    }

    #[test]
    fn transitions_follow_knowledge() {
        let stable = stable_with(&block(), &BitBoard::new());
        let start = LifeUnknown {
            state: stable.state,
            unknown: BitBoard::new(),
            unknown_stable: BitBoard::new(),
        };

        // A block cell survives.
        assert_eq!(
            start.unperturbed_transition_for((20, 20)),
            Transition::ON_TO_ON
        );
        assert_eq!(
            start.transitions_for(&stable, (20, 20)),
            Transition::ON_TO_ON
        );
        // A far-away empty cell stays empty.
        assert_eq!(
            start.transitions_for(&stable, (5, 5)),
            Transition::OFF_TO_OFF
        );
        assert!(!start.transition_is_perturbation((20, 20), Transition::ON_TO_ON));
        assert!(start.transition_is_perturbation((20, 20), Transition::ON_TO_OFF));
    }

    #[test]
    fn transfer_collapses_resolved_cells() {
        let region = BitBoard::cell((40, 40));
        let mut stable = stable_with(&BitBoard::new(), &region);
        let mut current = LifeUnknown {
            state: BitBoard::new(),
            unknown: region,
            unknown_stable: region,
        };

        stable.set_cell_on((40, 40));
        current.transfer_stable(&stable);
        assert!(current.state.get((40, 40)));
        assert!(current.unknown.is_empty());
    }
}
