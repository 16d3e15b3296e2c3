//! Run-length encoded pattern text.
//!
//! Input patterns use the Bellman-extended alphabet: `A` is an active on
//! cell, `B` a cell of the unknown stable search region, `C` a marked on
//! stable cell, `D` a marked off stable cell and `E` an on stable cell that
//! must stay on throughout (the stator). Output uses the same multi-state
//! scheme (the LifeBellman rule of Golly) and plain two-state `b`/`o` text.
//!
//! Output windows are centered on the origin, matching the board's
//! [`Debug`](crate::BitBoard) rendering.

use crate::{
    board::{BitBoard, N},
    error::Error,
};

/// The layers of a parsed multi-state pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatternLayers {
    /// Cells that are on in generation zero (`A`, `C` and `E`).
    pub state: BitBoard,
    /// The unknown-stable search region (`B`).
    pub history: BitBoard,
    /// Stable cells of known value (`C` on, `D` off).
    pub marked: BitBoard,
    /// The user-declared stator (`E`).
    pub original: BitBoard,
}

impl PatternLayers {
    /// Parses Bellman-alphabet RLE, ignoring any `x = …` header lines.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut result = Self::default();
        let mut x: i32 = 0;
        let mut y: i32 = 0;
        let mut count: i32 = 0;

        for line in text.lines() {
            if line.starts_with('x') {
                continue;
            }
            for ch in line.chars() {
                match ch {
                    '0'..='9' => count = count * 10 + (ch as i32 - '0' as i32),
                    '$' => {
                        y += count.max(1);
                        x = 0;
                        count = 0;
                    }
                    '!' => return Ok(result),
                    ' ' => (),
                    '.' | 'A'..='E' => {
                        for _ in 0..count.max(1) {
                            match ch {
                                'A' => result.state.set((x, y)),
                                'B' => result.history.set((x, y)),
                                'C' => {
                                    result.state.set((x, y));
                                    result.marked.set((x, y));
                                }
                                'D' => result.marked.set((x, y)),
                                'E' => {
                                    result.state.set((x, y));
                                    result.original.set((x, y));
                                }
                                _ => (),
                            }
                            x += 1;
                        }
                        count = 0;
                    }
                    _ => return Err(Error::UnknownPatternChar(ch)),
                }
            }
        }
        Ok(result)
    }

    /// Translates every layer.
    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.state = self.state.translate(dx, dy);
        self.history = self.history.translate(dx, dy);
        self.marked = self.marked.translate(dx, dy);
        self.original = self.original.translate(dx, dy);
    }

    /// Joins every layer with its image under `transf`.
    pub fn symmetrise(&mut self, transf: crate::symmetry::SymmetryTransform) {
        self.state |= self.state.transformed(transf);
        self.history |= self.history.transformed(transf);
        self.marked |= self.marked.transformed(transf);
        self.original |= self.original.transformed(transf);
    }
}

/// Parses plain two-state RLE (`b`/`o`/`$`) and shifts it by `(dx, dy)`.
pub fn parse_plain(text: &str, dx: i32, dy: i32) -> Result<BitBoard, Error> {
    let mut board = BitBoard::new();
    let mut x: i32 = 0;
    let mut y: i32 = 0;
    let mut count: i32 = 0;

    for ch in text.chars() {
        match ch {
            '0'..='9' => count = count * 10 + (ch as i32 - '0' as i32),
            'o' => {
                for _ in 0..count.max(1) {
                    board.set((x, y));
                    x += 1;
                }
                count = 0;
            }
            'b' => {
                x += count.max(1);
                count = 0;
            }
            '$' => {
                y += count.max(1);
                x = 0;
                count = 0;
            }
            '!' => break,
            '\n' | ' ' => (),
            _ => return Err(Error::UnknownPatternChar(ch)),
        }
    }
    Ok(board.translate(dx, dy))
}

/// Encodes a run, omitting the count for single cells.
fn push_run(out: &mut String, run: u32, tag: char) {
    if run > 1 {
        out.push_str(&run.to_string());
    }
    out.push(tag);
}

/// Renders two layers as four-state RLE over the centered window, using
/// `table[state_bit + 2 * marked_bit]` as the cell tags.
pub fn multi_state_rle(table: [char; 4], state: &BitBoard, marked: &BitBoard) -> String {
    let half = (N / 2) as i32;
    let mut result = String::new();
    let mut eol_count = 0;

    for j in 0..64 {
        let value = |i: i32| {
            let cell = (i - half, j - 32);
            state.get(cell) as usize + ((marked.get(cell) as usize) << 1)
        };
        let mut last_val = value(0);
        let mut run_count = 0;

        for i in 0..N as i32 {
            let val = value(i);
            if val != 0 && eol_count > 0 {
                push_run(&mut result, eol_count, '$');
                eol_count = 0;
            }
            if val != last_val {
                push_run(&mut result, run_count, table[last_val]);
                run_count = 0;
            }
            run_count += 1;
            last_val = val;
        }
        if last_val != 0 {
            push_run(&mut result, run_count, table[last_val]);
        }
        eol_count += 1;
    }
    if eol_count > 0 {
        push_run(&mut result, eol_count, '$');
    }
    result
}

/// The LifeBellman rendering of a state and its marked region.
pub fn life_bellman_rle(state: &BitBoard, marked: &BitBoard) -> String {
    multi_state_rle(['.', 'A', 'E', 'C'], state, marked)
}

/// Plain two-state RLE of a board over the centered window.
pub fn plain_rle(board: &BitBoard) -> String {
    let half = (N / 2) as i32;
    let mut result = String::new();
    let mut eol_count = 0;

    for j in 0..64 {
        let mut last_val = board.get((-half, j - 32));
        let mut run_count = 0;

        for i in 0..N as i32 {
            let val = board.get((i - half, j - 32));
            if val && eol_count > 0 {
                push_run(&mut result, eol_count, '$');
                eol_count = 0;
            }
            if val != last_val {
                push_run(&mut result, run_count, if last_val { 'o' } else { 'b' });
                run_count = 0;
            }
            run_count += 1;
            last_val = val;
        }
        if last_val {
            push_run(&mut result, run_count, 'o');
        }
        eol_count += 1;
    }
    if eol_count > 0 {
        push_run(&mut result, eol_count, '$');
    }
    result
}

/// A summary row: up to eight patterns side by side on a 70-cell pitch, as
/// plain two-state RLE.
pub fn row_rle(row: &[BitBoard]) -> String {
    const SPACING: i32 = 70;
    let half = (N / 2) as i32;
    let mut result = String::new();
    let mut eol_count = 0;

    for j in 0..SPACING {
        let mut last_val = if j < 64 {
            row[0].get((-half, j - 32))
        } else {
            false
        };
        let mut run_count = 0;

        for pat in row {
            for i in 0..SPACING {
                let val = i < N as i32 && j < 64 && pat.get((i - half, j - 32));
                if val && eol_count > 0 {
                    push_run(&mut result, eol_count, '$');
                    eol_count = 0;
                }
                if val != last_val {
                    push_run(&mut result, run_count, if last_val { 'o' } else { 'b' });
                    run_count = 0;
                }
                run_count += 1;
                last_val = val;
            }
        }
        if last_val {
            push_run(&mut result, run_count, 'o');
        }
        eol_count += 1;
    }
    if eol_count > 0 {
        push_run(&mut result, eol_count, '$');
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_layers() {
        let pat = PatternLayers::parse("x = 5, y = 2, rule = LifeBellman\n2AB$CDE!").unwrap();
        assert!(pat.state.get((0, 0)) && pat.state.get((1, 0)));
        assert!(pat.history.get((2, 0)));
        assert!(pat.state.get((0, 1)) && pat.marked.get((0, 1)));
        assert!(pat.marked.get((1, 1)) && !pat.state.get((1, 1)));
        assert!(pat.state.get((2, 1)) && pat.original.get((2, 1)));
        assert_eq!(pat.state.population(), 4);

        assert!(PatternLayers::parse("2AZ!").is_err());
    }

    #[test]
    fn parse_plain_patterns() {
        let glider = parse_plain("bo$2bo$3o!", 0, 0).unwrap();
        assert_eq!(glider.population(), 5);
        assert!(glider.get((1, 0)));
        assert!(glider.get((2, 1)));
        assert!(glider.get((0, 2)) && glider.get((1, 2)) && glider.get((2, 2)));

        let shifted = parse_plain("o!", 3, 4).unwrap();
        assert!(shifted.get((3, 4)));
    }

    #[test]
    fn plain_rle_round_trip() {
        let mut board = BitBoard::new();
        board.set((0, 0));
        board.set((1, 0));
        board.set((0, 1));
        board.set((1, 1));
        let text = plain_rle(&board);
        // The window starts 32 cells up and to the left of the origin.
        assert_eq!(text, "32$32b2o$32b2o31$");
    }

    #[test]
    fn row_rle_spacing() {
        let block = {
            let mut board = BitBoard::new();
            board.set((0, 0));
            board.set((1, 0));
            board.set((0, 1));
            board.set((1, 1));
            board
        };
        let one = row_rle(&[block]);
        let two = row_rle(&[block, block]);
        // The second copy sits 70 cells to the right of the first.
        assert!(one.contains("32b2o"));
        assert!(two.contains("32b2o68b2o"));
    }

    #[test]
    fn bellman_output_tags() {
        let state = BitBoard::cell((0, 0));
        let mut marked = BitBoard::cell((0, 0));
        marked.set((1, 0));
        let text = life_bellman_rle(&state, &marked);
        assert!(text.contains("CE"));
    }
}
