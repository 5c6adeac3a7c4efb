//! Module for counting and printing the number of variations from a given position
//
//  Copyright 2019 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use crate::chess::*;

/// Returns the number of variations of the given `depth` for each legal move from `pos`, in the
/// order the moves were generated
pub fn divide(pos: &mut Position, depth: usize) -> Vec<(Move, u64)> {
    let mut stack = MoveStack::new();
    let mut results = Vec::new();

    if depth < 1 || depth > stack.depth() {
        return results;
    }

    pos.generate_legal(&mut stack[0]);
    for i in 0..stack[0].len() {
        let mv = stack[0][i];
        let info = pos.do_move(mv);
        let count = count_from(pos, depth - 1, 1, &mut stack);
        pos.undo_move(mv, info);
        results.push((mv, count));
    }

    results
}

/// Print the number of variations of the given `depth` for each legal move from `pos`
pub fn print(pos: &mut Position, depth: usize) -> u64 {
    let mut total = 0;

    for (mv, count) in divide(pos, depth) {
        let info = pos.do_move(mv);
        println!("\t{:7}\t{:12}\t{}", mv.to_string(), count, pos);
        pos.undo_move(mv, info);
        total += count;
    }

    total
}

/// Count the number of variations of the given `depth` from `pos`
///
/// ```rust
/// use scarecrow::chess::{variations, Position};
///
/// let mut pos = Position::new();
/// assert_eq!(variations::count(&mut pos, 3), 8902);
/// ```
pub fn count(pos: &mut Position, depth: usize) -> u64 {
    let mut stack = MoveStack::new();
    if depth > stack.depth() {
        return 0;
    }
    count_from(pos, depth, 0, &mut stack)
}

fn count_from(pos: &mut Position, depth: usize, ply: usize, stack: &mut MoveStack) -> u64 {
    if depth < 1 {
        return 1;
    }

    let n = pos.generate_legal(&mut stack[ply]);
    // bulk count at the frontier
    if depth == 1 {
        return n as u64;
    }

    let mut total = 0;
    for i in 0..n {
        let mv = stack[ply][i];
        let info = pos.do_move(mv);
        total += count_from(pos, depth - 1, ply + 1, stack);
        pos.undo_move(mv, info);
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_leave_the_position_unchanged() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let mut pos = Position::from_fen_str(fen).expect("valid");
        assert_eq!(count(&mut pos, 2), 2039);
        assert_eq!(pos.to_fen_str(), fen);
        assert_eq!(pos, Position::from_fen_str(fen).expect("valid"));
    }

    #[test]
    fn divide_sums_to_count() {
        let mut pos = Position::new();
        let divided = divide(&mut pos, 3);
        assert_eq!(divided.len(), 20);
        assert_eq!(divided.iter().map(|&(_, n)| n).sum::<u64>(), count(&mut pos, 3));
    }

    #[test]
    fn zero_depth_is_one_variation() {
        let mut pos = Position::new();
        assert_eq!(count(&mut pos, 0), 1);
        assert!(divide(&mut pos, 0).is_empty());
    }
}
