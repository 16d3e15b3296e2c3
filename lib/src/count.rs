//! Bit-sliced neighbourhood counting.
//!
//! A [`NeighbourCount`] holds, for every cell at once, the number of live
//! Moore neighbours as four bit planes. The counts are built column-wise
//! from half- and full-adders on 64-bit words; the same adders also provide
//! single-column and strip variants so that a propagation pass touching one
//! column does not have to recount the whole board.
//!
//! [`Nibble`] is the word-level view of the same encoding: one 4-bit sliced
//! number per cell of a column. The constraint kernels in the stable and
//! transient states are written as comparisons and arithmetic on nibbles;
//! these few helpers replace the generated formula dumps a circuit compiler
//! would emit, and the test suite checks them against plain integer
//! arithmetic.

use crate::board::{BitBoard, N};

pub(crate) fn half_add(a: u64, b: u64) -> (u64, u64) {
    (a ^ b, a & b)
}

pub(crate) fn full_add(a: u64, b: u64, c: u64) -> (u64, u64) {
    let half = a ^ b;
    (half ^ c, (a & b) | (c & half))
}

/// Per-cell live-neighbour counts of a whole board, as four bit planes.
///
/// The count of a cell is `8*bit3 + 4*bit2 + 2*bit1 + bit0`, read at that
/// cell's position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NeighbourCount {
    pub bit3: BitBoard,
    pub bit2: BitBoard,
    pub bit1: BitBoard,
    pub bit0: BitBoard,
}

/// 2-bit vertical counts of one column word.
///
/// The first pair sums the three cells of a column (used for the side
/// columns of a neighbourhood), the second only the two vertical neighbours
/// (used for the column the cell itself is in).
fn count_column(a: u64) -> ((u64, u64), (u64, u64)) {
    let l = a.rotate_left(1);
    let r = a.rotate_right(1);
    let triple = (l ^ r ^ a, ((l ^ r) & a) | (l & r));
    let pair = (l ^ r, l & r);
    (triple, pair)
}

/// Sums the 2-bit vertical counts of the three columns of a neighbourhood:
/// the full side columns and the centerless middle column. The total is at
/// most 8 and fits the four planes exactly.
fn combine_columns(u: (u64, u64), c: (u64, u64), l: (u64, u64)) -> Nibble {
    let (uc0, uc_carry0) = half_add(u.0, c.0);
    let (uc1, uc2) = full_add(u.1, c.1, uc_carry0);

    let (b0, carry0) = half_add(uc0, l.0);
    let (b1, carry1) = full_add(uc1, l.1, carry0);
    let (b2, b3) = half_add(uc2, carry1);
    Nibble { b3, b2, b1, b0 }
}

impl NeighbourCount {
    /// Counts the live neighbours of every cell of `board`.
    pub fn new(board: &BitBoard) -> Self {
        let mut triple = [(0u64, 0u64); N];
        let mut pair = [(0u64, 0u64); N];
        for i in 0..N {
            (triple[i], pair[i]) = count_column(board[i]);
        }

        let mut result = Self::default();
        for i in 0..N {
            let u = (i + N - 1) % N;
            let l = (i + 1) % N;
            let n = combine_columns(triple[u], pair[i], triple[l]);
            result.bit3[i] = n.b3;
            result.bit2[i] = n.b2;
            result.bit1[i] = n.b1;
            result.bit0[i] = n.b0;
        }
        result
    }

    /// The sliced count of one column.
    pub(crate) fn column(&self, i: usize) -> Nibble {
        Nibble {
            b3: self.bit3[i],
            b2: self.bit2[i],
            b1: self.bit1[i],
            b0: self.bit0[i],
        }
    }

    /// Per-column difference `self - other`, modulo 16.
    pub(crate) fn sub_column(&self, other: &NeighbourCount, i: usize) -> Nibble {
        self.column(i).sub(other.column(i))
    }
}

/// Counts the live neighbours of the cells of a single column without
/// touching the rest of the board.
pub(crate) fn column_count(board: &BitBoard, column: usize) -> Nibble {
    let (u, _) = count_column(board[(column + N - 1) % N]);
    let (_, c) = count_column(board[column]);
    let (l, _) = count_column(board[(column + 1) % N]);
    combine_columns(u, c, l)
}

/// One 4-bit sliced number per bit position of a column word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Nibble {
    pub b3: u64,
    pub b2: u64,
    pub b1: u64,
    pub b0: u64,
}

impl Nibble {
    /// Every lane holding the constant `k`.
    pub fn splat(k: u32) -> Self {
        let bit = |i: u32| if k >> i & 1 != 0 { !0 } else { 0 };
        Nibble {
            b3: bit(3),
            b2: bit(2),
            b1: bit(1),
            b0: bit(0),
        }
    }

    fn bit(self, i: u32) -> u64 {
        match i {
            0 => self.b0,
            1 => self.b1,
            2 => self.b2,
            _ => self.b3,
        }
    }

    /// Lanes equal to the constant `k` (`k < 16`).
    pub fn eq_const(self, k: u32) -> u64 {
        let mut result = !0;
        for i in 0..4 {
            let b = self.bit(i);
            result &= if k >> i & 1 != 0 { b } else { !b };
        }
        result
    }

    /// Lanes whose value is at least `k`.
    pub fn ge_const(self, k: u32) -> u64 {
        if k == 0 {
            return !0;
        }
        if k > 15 {
            return 0;
        }
        let mut gt = 0;
        let mut eq = !0;
        for i in (0..4).rev() {
            let b = self.bit(i);
            let kb: u64 = if k >> i & 1 != 0 { !0 } else { 0 };
            gt |= eq & b & !kb;
            eq &= !(b ^ kb);
        }
        gt | eq
    }

    /// Lanes whose value is at most `k`.
    pub fn le_const(self, k: u32) -> u64 {
        !self.ge_const(k + 1)
    }

    /// Lanes whose value is strictly less than `k`.
    pub fn lt_const(self, k: u32) -> u64 {
        !self.ge_const(k)
    }

    /// Lane-wise sum modulo 16.
    pub fn add(self, other: Nibble) -> Self {
        let (b0, c0) = half_add(self.b0, other.b0);
        let (b1, c1) = full_add(self.b1, other.b1, c0);
        let (b2, c2) = full_add(self.b2, other.b2, c1);
        let (b3, _) = full_add(self.b3, other.b3, c2);
        Nibble { b3, b2, b1, b0 }
    }

    /// Lane-wise difference modulo 16 (two's complement lanes).
    pub fn sub(self, other: Nibble) -> Self {
        let (b0, c0) = full_add(self.b0, !other.b0, !0);
        let (b1, c1) = full_add(self.b1, !other.b1, c0);
        let (b2, c2) = full_add(self.b2, !other.b2, c1);
        let (b3, _) = full_add(self.b3, !other.b3, c2);
        Nibble { b3, b2, b1, b0 }
    }

    /// Reads the lane at bit position `y` as an integer.
    #[cfg(test)]
    pub fn lane(self, y: u32) -> u32 {
        (((self.b3 >> y & 1) << 3) | ((self.b2 >> y & 1) << 2) | ((self.b1 >> y & 1) << 1)
            | (self.b0 >> y & 1)) as u32
    }
}

/// Per-cell countdown timers.
///
/// `start` begins a countdown of `n` ticks at every newly set cell; once a
/// cell's countdown has elapsed it appears in `finished` and stays there
/// until `reset`. `B` is the counter width in bit planes, so `n` may be at
/// most `2^B - 1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Countdown<const B: usize> {
    pub started: BitBoard,
    pub finished: BitBoard,
    counter: [BitBoard; B],
    n: u32,
}

impl<const B: usize> Countdown<B> {
    /// A timer set of duration `n` ticks with no cells counting.
    pub fn new(n: u32) -> Self {
        debug_assert!(n < 1 << B);
        Countdown {
            started: BitBoard::new(),
            finished: BitBoard::new(),
            counter: [BitBoard::new(); B],
            n,
        }
    }

    /// Begins the countdown at every cell of `cells` not already counting.
    pub fn start(&mut self, cells: &BitBoard) {
        let new_started = *cells & !self.started;
        for (i, plane) in self.counter.iter_mut().enumerate() {
            if self.n >> i & 1 != 0 {
                *plane |= new_started;
            }
        }
        self.started |= *cells;
    }

    /// Stops and clears the countdown at every cell of `cells`.
    pub fn reset(&mut self, cells: &BitBoard) {
        for plane in &mut self.counter {
            *plane &= !*cells;
        }
        self.started &= !*cells;
        self.finished &= !*cells;
    }

    /// Advances every started countdown by one tick.
    pub fn tick(&mut self) {
        let mut carry = self.started;
        for plane in &mut self.counter {
            *plane ^= carry;
            carry &= *plane;
        }
        self.finished |= carry;
    }
}
