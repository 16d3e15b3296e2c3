//! The transition algebra.
//!
//! A frontier cell is branched on by choosing what happens to it across one
//! generation. The five possibilities form a small bitset so that a whole
//! set of still-allowed transitions travels in one byte.

use bitflags::bitflags;

bitflags! {
    /// A set of one-generation transitions of a single cell.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Transition: u8 {
        /// The cell is off and stays off.
        const OFF_TO_OFF = 1 << 0;
        /// The cell is off and switches on.
        const OFF_TO_ON = 1 << 1;
        /// The cell is on and switches off.
        const ON_TO_OFF = 1 << 2;
        /// The cell is on and stays on.
        const ON_TO_ON = 1 << 3;
        /// The cell equals the stable background before and after, whatever
        /// that value turns out to be.
        const STABLE_TO_STABLE = 1 << 4;

        /// Every transition.
        const ANY = Self::OFF_TO_OFF.bits()
            | Self::OFF_TO_ON.bits()
            | Self::ON_TO_OFF.bits()
            | Self::ON_TO_ON.bits()
            | Self::STABLE_TO_STABLE.bits();
        /// The transitions that leave the cell unchanged.
        const UNCHANGING = Self::OFF_TO_OFF.bits()
            | Self::ON_TO_ON.bits()
            | Self::STABLE_TO_STABLE.bits();
    }
}

impl Transition {
    /// The highest-valued transition of the set, or the empty set.
    pub fn highest(self) -> Transition {
        if self.is_empty() {
            return Transition::empty();
        }
        Transition::from_bits_retain(1 << (7 - self.bits().leading_zeros()))
    }

    /// Whether the set holds exactly one transition.
    pub fn is_singleton(self) -> bool {
        let bits = self.bits();
        bits != 0 && bits & (bits - 1) == 0
    }

    /// Number of transitions in the set.
    pub fn count(self) -> u32 {
        self.bits().count_ones()
    }

    /// Merges branches that do not need to be tried separately: keeping an
    /// on cell on and keeping an off cell off are both just "stay stable",
    /// so when both remain they collapse into [`STABLE_TO_STABLE`].
    ///
    /// [`STABLE_TO_STABLE`]: Self::STABLE_TO_STABLE
    #[must_use]
    pub fn simplify(self) -> Transition {
        let mut result = self;
        let has_on = result.contains(Transition::ON_TO_ON);
        let has_off = result.contains(Transition::OFF_TO_OFF);

        if has_on && has_off {
            result |= Transition::STABLE_TO_STABLE;
            result &= !(Transition::ON_TO_ON | Transition::OFF_TO_OFF);
        } else if result.contains(Transition::STABLE_TO_STABLE) {
            // Either one alone is subsumed by the stable branch.
            result &= !(Transition::ON_TO_ON | Transition::OFF_TO_OFF);
        }
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn highest_and_singleton() {
        let set = Transition::OFF_TO_ON | Transition::ON_TO_OFF;
        assert_eq!(set.highest(), Transition::ON_TO_OFF);
        assert!(!set.is_singleton());
        assert!(set.highest().is_singleton());
        assert_eq!(Transition::empty().highest(), Transition::empty());
        assert_eq!(set.count(), 2);
    }

    #[test]
    fn simplify_collapses_stable() {
        let both = Transition::ON_TO_ON | Transition::OFF_TO_OFF | Transition::OFF_TO_ON;
        assert_eq!(
            both.simplify(),
            Transition::STABLE_TO_STABLE | Transition::OFF_TO_ON
        );

        // With only one of the pair, a separate non-stable branch is
        // redundant.
        let on_only = Transition::ON_TO_ON | Transition::STABLE_TO_STABLE;
        assert_eq!(on_only.simplify(), Transition::STABLE_TO_STABLE);

        let stable_only = Transition::STABLE_TO_STABLE | Transition::ON_TO_OFF;
        assert_eq!(stable_only.simplify(), stable_only);
        assert_eq!(
            (Transition::OFF_TO_ON | Transition::ON_TO_OFF).simplify(),
            Transition::OFF_TO_ON | Transition::ON_TO_OFF
        );
    }
}
