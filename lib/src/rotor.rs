//! Oscillator classification.
//!
//! When a branch blows through its active window without recovering, it
//! may still be a genuine oscillator worth reporting. The period is found
//! with a monotone stack of state hashes; the changing cells (the rotor)
//! are then cut out per component and rendered as a canonical description
//! string, minimal over the eight orientations, so equivalent rotors
//! deduplicate by plain string comparison.

use crate::{
    board::BitBoard,
    stable::LifeStable,
    symmetry::SymmetryTransform,
    unknown::LifeUnknown,
};

/// How many generations the period detector is willing to look through.
const MAX_PERIOD_GENS: u32 = 60;

/// A canonical rotor description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rotor {
    /// The oscillator period.
    pub period: u32,
    /// Number of rotor cells.
    pub pop: u32,
    /// Rotor bounding box `(width, height)`.
    pub size: (u32, u32),
    /// The cell-by-cell description, rows separated by spaces.
    pub desc: String,
}

impl Rotor {
    /// The fingerprint used for reporting and deduplication, e.g.
    /// `p4 r6 2x5 .77. 64.46 ...`.
    pub fn fingerprint(&self) -> String {
        format!(
            "p{} r{} {}x{} {}",
            self.period, self.pop, self.size.1, self.size.0, self.desc
        )
    }
}

/// Finds the period of the evolving configuration, or 0 if none shows up
/// within [`MAX_PERIOD_GENS`] generations.
///
/// Keeps a stack of `(hash, generation)` pairs with strictly increasing
/// hashes; a repeated hash surfaces as soon as it is pushed onto a stack
/// top holding the same value.
pub fn determine_period(state: &LifeUnknown, stable: &LifeStable) -> u32 {
    let mut current = *state;
    let mut min_hashes: Vec<(u64, u32)> = Vec::new();

    for i in 1..MAX_PERIOD_GENS {
        let active = stable.state ^ current.state;
        let new_hash = active.hash();

        while let Some(&(top_hash, top_gen)) = min_hashes.last() {
            if top_hash < new_hash {
                break;
            }
            if top_hash == new_hash {
                return i - top_gen;
            }
            min_hashes.pop();
        }
        min_hashes.push((new_hash, i));

        current = current.step_maintaining(stable);
    }
    0
}

/// Description of a rotor already moved to the origin, in one fixed
/// orientation.
///
/// Rotor cells encode `16 * (on in the chosen phase) + stable neighbour
/// count` as a digit character; stator and empty cells are dots.
fn unnormalised_desc(
    gen_zero: &BitBoard,
    stator: &BitBoard,
    rotor: &BitBoard,
    dims: (u32, u32),
    period: u32,
) -> Rotor {
    let mut desc = String::new();
    for row in 0..dims.1 as i32 {
        for col in 0..dims.0 as i32 {
            if rotor.get((col, row)) {
                let code = 48
                    + 16 * gen_zero.get((col, row)) as u32
                    + stator.count_neighbours((col, row));
                desc.push(char::from_u32(code).unwrap_or('?'));
            } else {
                desc.push('.');
            }
        }
        if row + 1 != dims.1 as i32 {
            desc.push(' ');
        }
    }
    Rotor {
        period,
        pop: rotor.population(),
        size: dims,
        desc,
    }
}

/// The minimal description of one phase over the eight orientations.
fn phase_desc(
    gen_zero: &BitBoard,
    stator: &BitBoard,
    rotor: &BitBoard,
    dims: (u32, u32),
    period: u32,
) -> Rotor {
    use SymmetryTransform::*;

    let mut minimal: Option<Rotor> = None;
    for transf in [
        Identity,
        Rotate90,
        Rotate180OddBoth,
        Rotate270,
        ReflectAcrossYeqX,
        ReflectAcrossX,
        ReflectAcrossYeqNegXP1,
        ReflectAcrossY,
    ] {
        // Shift the transformed pattern back so its upper left corner sits
        // at the origin.
        let (w, h) = (dims.0 as i32, dims.1 as i32);
        let shift = match transf {
            Identity | ReflectAcrossYeqX => (0, 0),
            Rotate90 => (h - 1, 0),
            ReflectAcrossY => (w - 1, 0),
            Rotate180OddBoth => (w - 1, h - 1),
            ReflectAcrossX => (0, h - 1),
            Rotate270 => (0, w - 1),
            ReflectAcrossYeqNegXP1 => (h - 1, w - 1),
            _ => (0, 0),
        };

        let place = |board: &BitBoard| board.transformed(transf).translate(shift.0, shift.1);
        let rotor_t = place(rotor);
        let candidate = unnormalised_desc(
            &place(gen_zero),
            &place(stator),
            &rotor_t,
            rotor_t.width_height(),
            period,
        );

        if minimal
            .as_ref()
            .map_or(true, |m| candidate.fingerprint() < m.fingerprint())
        {
            minimal = Some(candidate);
        }
    }
    minimal.unwrap()
}

/// The canonical description of an oscillator given one full period of
/// phases.
fn rotor_desc(states: &[BitBoard], period: u32) -> Rotor {
    let mut stator = BitBoard::full();
    let mut rotor = BitBoard::new();
    for state in states {
        stator &= *state;
        rotor |= *state;
    }
    rotor &= !stator;

    let (min_x, min_y, _, _) = rotor.bounding_box().unwrap_or((0, 0, 0, 0));
    let rotor = rotor.translate(-min_x, -min_y);
    let stator = stator.translate(-min_x, -min_y);

    let mut minimal: Option<Rotor> = None;
    for state in states {
        let gen_zero = state.translate(-min_x, -min_y);
        let candidate = phase_desc(&gen_zero, &stator, &rotor, rotor.width_height(), period);
        if minimal
            .as_ref()
            .map_or(true, |m| candidate.fingerprint() < m.fingerprint())
        {
            minimal = Some(candidate);
        }
    }
    minimal.unwrap()
}

/// Splits the rotor into components and describes each separately.
pub fn separated_rotor_descs(
    state: &LifeUnknown,
    stable: &LifeStable,
    period: u32,
) -> Vec<Rotor> {
    let mut current = *state;
    let mut states = Vec::with_capacity(period as usize);
    let mut stator = BitBoard::full();
    let mut rotor = BitBoard::new();
    for _ in 0..period {
        stator &= current.state;
        rotor |= current.state;
        states.push(current.state);
        current = current.step_maintaining(stable);
    }
    rotor &= !stator;

    let mut result = Vec::new();
    for component in rotor.components() {
        let mask = component.big_zoi();
        let mut phases: Vec<BitBoard> = Vec::new();
        for (i, state) in states.iter().enumerate() {
            let phase = *state & mask;
            if i > 0 && phase == phases[0] {
                break;
            }
            phases.push(phase);
        }
        let sub_period = phases.len() as u32;
        result.push(rotor_desc(&phases, sub_period));
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::board::BitBoard;

    fn all_off_stable() -> LifeStable {
        let mut stable = LifeStable::new();
        stable.set_off(&BitBoard::full());
        stable
    }

    #[test]
    fn blinker_period() {
        let mut blinker = BitBoard::new();
        for x in 20..23 {
            blinker.set((x, 20));
        }
        let state = LifeUnknown {
            state: blinker,
            unknown: BitBoard::new(),
            unknown_stable: BitBoard::new(),
        };
        assert_eq!(determine_period(&state, &all_off_stable()), 2);
    }

    #[test]
    fn still_life_period_one() {
        let block = BitBoard::solid_rect(20, 20, 2, 2);
        let state = LifeUnknown {
            state: block,
            unknown: BitBoard::new(),
            unknown_stable: BitBoard::new(),
        };
        assert_eq!(determine_period(&state, &all_off_stable()), 1);
    }

    #[test]
    fn blinker_rotor_description() {
        let mut blinker = BitBoard::new();
        for x in 20..23 {
            blinker.set((x, 20));
        }
        let state = LifeUnknown {
            state: blinker,
            unknown: BitBoard::new(),
            unknown_stable: BitBoard::new(),
        };
        let rotors = separated_rotor_descs(&state, &all_off_stable(), 2);
        assert_eq!(rotors.len(), 1);
        let rotor = &rotors[0];
        assert_eq!(rotor.period, 2);
        // The blinker's rotor is the plus-shape minus its center.
        assert_eq!(rotor.pop, 4);
        assert_eq!(rotor.size, (3, 3));
        assert!(rotor.fingerprint().starts_with("p2 r4 3x3 "));

        // The same oscillator in another phase and place yields the same
        // fingerprint.
        let mut upright = BitBoard::new();
        for y in 40..43 {
            upright.set((5, y));
        }
        let other = LifeUnknown {
            state: upright,
            unknown: BitBoard::new(),
            unknown_stable: BitBoard::new(),
        };
        let rotors2 = separated_rotor_descs(&other, &all_off_stable(), 2);
        assert_eq!(rotors2[0].fingerprint(), rotor.fingerprint());
    }
}
