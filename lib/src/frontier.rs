//! The lookahead window.
//!
//! The search peers up to [`MAX_FRONTIER_GENS`] generations ahead. A
//! *frontier cell* of a lookahead generation is a cell that just became
//! unknown out of a fully known neighbourhood: its transition is decided
//! purely by the stable options, which makes it the natural branch point.

use crate::{
    board::{BitBoard, Cell},
    stable::LifeStable,
    transition::Transition,
    unknown::LifeUnknown,
};

/// How far ahead the frontier is computed.
pub const MAX_FRONTIER_GENS: usize = 4;

/// One generation of lookahead.
#[derive(Clone, Debug, Default)]
pub struct FrontierGeneration {
    /// The generation this one was stepped from.
    pub prev: LifeUnknown,
    /// The looked-ahead state.
    pub state: LifeUnknown,
    /// Absolute generation number of `state`.
    pub gen: u32,
    /// The branch candidates of this generation.
    pub frontier_cells: BitBoard,
    /// Cells differing from the stable background.
    pub active: BitBoard,
    /// Cells differing from the previous generation.
    pub changes: BitBoard,
    /// Cells that must not be active here.
    pub forced_inactive: BitBoard,
    /// Cells that must not change here.
    pub forced_unchanging: BitBoard,
}

impl FrontierGeneration {
    /// Commits a transition at `cell` on both sides of the step.
    pub fn set_transition(&mut self, cell: Cell, transition: Transition) {
        self.prev.set_transition_prev(cell, transition);
        self.state.set_transition_result(cell, transition);
    }
}

/// A window of consecutive lookahead generations.
///
/// `generations[start..start + len]` are valid; populating resets `start`
/// to zero and advancing moves it forward, so the indices never wrap.
#[derive(Clone, Debug, Default)]
pub struct Frontier {
    pub generations: [FrontierGeneration; MAX_FRONTIER_GENS],
    pub start: usize,
    pub len: usize,
}

impl Frontier {
    /// Drops every stored generation.
    pub fn clear(&mut self) {
        self.start = 0;
        self.len = 0;
    }

    /// The earliest stored generation.
    pub fn head(&self) -> &FrontierGeneration {
        &self.generations[self.start]
    }
}

/// The transitions left open for a cell by the knowledge and the forcing
/// masks.
///
/// `STABLE_TO_STABLE` is deliberately absent: it only reappears when
/// [`Transition::simplify`] merges the two unchanging branches.
pub fn allowed_transitions(
    state: bool,
    unknown_stable: bool,
    stable_state: bool,
    forced_inactive: bool,
    forced_unchanging: bool,
    in_zoi: bool,
    unperturbed: Transition,
) -> Transition {
    let mut result = Transition::ANY & !Transition::STABLE_TO_STABLE;

    // A known previous state rules out half the cases.
    if !unknown_stable {
        result &= if state {
            Transition::ON_TO_OFF | Transition::ON_TO_ON
        } else {
            Transition::OFF_TO_OFF | Transition::OFF_TO_ON
        };
    }

    if forced_inactive && in_zoi {
        if unknown_stable {
            result &= !(Transition::OFF_TO_ON | Transition::ON_TO_OFF);
        } else if stable_state {
            result &= !(Transition::OFF_TO_OFF | Transition::ON_TO_OFF);
        } else {
            result &= !(Transition::OFF_TO_ON | Transition::ON_TO_ON);
        }
    }

    // Outside the zone of influence nothing may be perturbed.
    if forced_inactive && !in_zoi {
        result &= unperturbed | Transition::OFF_TO_OFF | Transition::ON_TO_ON;
    }

    if forced_unchanging && in_zoi {
        result &= Transition::OFF_TO_OFF | Transition::ON_TO_ON;
    }

    result
}

/// [`allowed_transitions`] for a concrete frontier cell.
pub fn allowed_transitions_for(
    generation: &FrontierGeneration,
    stable: &LifeStable,
    cell: Cell,
) -> Transition {
    allowed_transitions(
        generation.prev.state.get(cell),
        stable.unknown.get(cell),
        stable.state.get(cell),
        generation.forced_inactive.get(cell),
        generation.forced_unchanging.get(cell),
        stable.state_zoi.get(cell),
        generation.prev.unperturbed_transition_for(cell),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_state_restricts() {
        let t = allowed_transitions(true, false, true, false, false, true, Transition::ON_TO_ON);
        assert_eq!(t, Transition::ON_TO_OFF | Transition::ON_TO_ON);

        let t = allowed_transitions(false, true, false, false, false, true, Transition::OFF_TO_OFF);
        assert_eq!(t, Transition::ANY & !Transition::STABLE_TO_STABLE);
    }

    #[test]
    fn forcing_masks_restrict() {
        // Forced inactive inside the ZOI: an unknown-stable cell may not
        // move away from the background.
        let t = allowed_transitions(false, true, false, true, false, true, Transition::OFF_TO_OFF);
        assert_eq!(t, Transition::OFF_TO_OFF | Transition::ON_TO_ON);

        // Outside the ZOI only the unperturbed transition (or staying
        // put) is allowed.
        let t = allowed_transitions(false, false, false, true, false, false, Transition::OFF_TO_ON);
        assert_eq!(t, Transition::OFF_TO_OFF | Transition::OFF_TO_ON);

        // Forced unchanging inside the ZOI.
        let t = allowed_transitions(true, false, true, false, true, true, Transition::ON_TO_ON);
        assert_eq!(t, Transition::ON_TO_ON);
    }
}
