//! Transformations of the torus.
//!
//! These are the elements of the dihedral group _D_<sub>8</sub>, with the
//! even/odd variants needed because a reflection axis can run either through
//! a row of cells or between two rows.
//!
//! The configured symmetry is applied once, while loading the pattern: the
//! input layers are joined with their transformed copies. The search itself
//! never consults the symmetry again.

use crate::error::Error;
use std::str::FromStr;

/// A transformation of the board.
///
/// `Even` variants reflect across a grid line between two cells (so `(0, 0)`
/// maps to `(0, -1)` for [`ReflectAcrossXEven`](Self::ReflectAcrossXEven));
/// the odd variants fix a row or column of cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SymmetryTransform {
    /// Leaves the board alone.
    #[default]
    Identity,
    /// Reflects across the x-axis, between two rows.
    ReflectAcrossXEven,
    /// Reflects across a row of cells.
    ReflectAcrossX,
    /// Reflects across the y-axis, between two columns.
    ReflectAcrossYEven,
    /// Reflects across a column of cells.
    ReflectAcrossY,
    /// Quarter turn, fixing a grid point.
    Rotate90Even,
    /// Quarter turn, fixing a cell.
    Rotate90,
    /// Three-quarter turn, fixing a grid point.
    Rotate270Even,
    /// Three-quarter turn, fixing a cell.
    Rotate270,
    /// Half turn fixing a cell.
    Rotate180OddBoth,
    /// Half turn fixing the midpoint of a horizontal pair.
    Rotate180EvenHorizontal,
    /// Half turn fixing the midpoint of a vertical pair.
    Rotate180EvenVertical,
    /// Half turn fixing a grid point.
    Rotate180EvenBoth,
    /// Reflects across the diagonal `y = x`.
    ReflectAcrossYeqX,
    /// Reflects across the antidiagonal, sending `(0, 0)` to `(-1, -1)`.
    ReflectAcrossYeqNegX,
    /// Reflects across the antidiagonal, fixing `(0, 0)`.
    ReflectAcrossYeqNegXP1,
}

/// Parses the symmetry names accepted in configuration files.
///
/// The names describe the symmetry of the whole input, so e.g. `D2|` is the
/// reflection generating that symmetry group.
impl FromStr for SymmetryTransform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" => Ok(Self::Identity),
            "D2|" => Ok(Self::ReflectAcrossY),
            "D2|even" => Ok(Self::ReflectAcrossYEven),
            "D2-" => Ok(Self::ReflectAcrossX),
            "D2-even" => Ok(Self::ReflectAcrossXEven),
            "D2\\" => Ok(Self::ReflectAcrossYeqX),
            "C2" | "C2oddboth" | "C2bothodd" => Ok(Self::Rotate180OddBoth),
            "C2even" | "C2botheven" | "C2evenboth" => Ok(Self::Rotate180EvenBoth),
            "C2horizontaleven" | "C2|even" => Ok(Self::Rotate180EvenHorizontal),
            "C2verticaleven" | "C2-even" => Ok(Self::Rotate180EvenVertical),
            _ => Err(Error::UnknownSymmetry(s.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_names() {
        assert_eq!(
            "identity".parse::<SymmetryTransform>().unwrap(),
            SymmetryTransform::Identity
        );
        assert_eq!(
            "D2\\".parse::<SymmetryTransform>().unwrap(),
            SymmetryTransform::ReflectAcrossYeqX
        );
        assert_eq!(
            "C2evenboth".parse::<SymmetryTransform>().unwrap(),
            SymmetryTransform::Rotate180EvenBoth
        );
        assert!("D4".parse::<SymmetryTransform>().is_err());
    }
}
