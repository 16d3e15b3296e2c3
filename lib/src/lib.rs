/*!
__catsrc__ searches for catalysts and oscillators in Conway's Game of
Life.

The input is a partially specified grid: a known active seed, a known
stable background, and a region of *unknown-stable* cells. The engine
finds assignments of the unknown cells forming a still life that interacts
with the seed and then recovers (a catalyst), subject to configurable
limits on how far, how long and how wide the reaction may run.

The solver keeps three-valued knowledge on bit-sliced boards: a
[`LifeStable`] tracks which still-life neighbourhood options remain per
cell and propagates their consequences, a [`LifeUnknown`] steps the
evolving configuration forward without losing what is known, and
[`Search`] branches over the per-cell [`Transition`]s of the frontier,
the cells whose next value is decided purely by the stable background.

# Example

Complete a partial block into a still life:

```rust
use catsrc_lib::{BitBoard, LifeStable};
use std::time::Duration;

let mut known = BitBoard::new();
known.set((10, 10));
known.set((11, 10));

let mut stable = LifeStable::new();
stable.set_on(&known);
stable.set_off(&!known.big_zoi());

let completed = stable.complete_stable(Duration::from_secs(1), true);
assert_eq!(completed.step(), completed);
```
*/

pub mod board;
pub mod config;
pub mod count;
pub mod error;
pub mod frontier;
pub mod rle;
pub mod rotor;
pub mod search;
pub mod stable;
pub mod symmetry;
pub mod transition;
pub mod unknown;

pub use board::{BitBoard, Cell};
pub use config::{SearchConfig, SearchParams};
pub use error::Error;
pub use search::{Search, Solution};
pub use stable::{LifeStable, PropagateResult, StableOptions};
pub use symmetry::SymmetryTransform;
pub use transition::Transition;
pub use unknown::LifeUnknown;
