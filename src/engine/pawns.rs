//! Pawn structure evaluation and its cache
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use crate::chess::{Color, File, Piece, Position, Zobrist};
use crate::chess::bitboard::{Bitboard, Direction, pawn_attacks};
use super::weights::{Phase, Weights};

////////////////////////////////////////////////////////////////////////////////////////////////////
/// The pawn structure score of one position
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PawnEntry {
    key: Zobrist,
    // white minus black, per phase
    scores: [i32; Phase::COUNT],
}

impl PawnEntry {
    /// Returns the pawn structure score for `phase`, from White's point of view
    pub fn score(&self, phase: Phase) -> i32 {
        self.scores[phase as usize]
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// A cache of pawn structure scores keyed by the pawn hash
#[derive(Debug)]
pub struct PawnTable(Vec<Option<PawnEntry>>);

impl PawnTable {
    const SIZE: usize = 16_384;

    /// Creates an empty table
    pub fn new() -> PawnTable {
        PawnTable(vec![None; Self::SIZE])
    }

    /// Removes every entry
    pub fn clear(&mut self) {
        for entry in self.0.iter_mut() {
            *entry = None;
        }
    }

    /// Returns the pawn structure score of `pos`, computing and storing it if needed
    pub fn entry(&mut self, pos: &Position, weights: &Weights) -> PawnEntry {
        let key = pos.pawn_key();
        let index = u64::from(key) as usize & (Self::SIZE - 1);

        match self.0[index] {
            Some(entry) if entry.key == key => entry,
            _ => {
                let entry = analyze(pos, weights);
                self.0[index] = Some(entry);
                entry
            },
        }
    }
}

impl Default for PawnTable {
    fn default() -> Self {
        PawnTable::new()
    }
}

/// Counts of each structural feature for one side
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
struct Features {
    doubled: i32,
    tripled: i32,
    isolated: i32,
    backward: i32,
    passed: i32,
}

fn features(pos: &Position, us: Color) -> Features {
    let ours = pos.pieces(us, Piece::Pawn);
    let theirs = pos.pieces(!us, Piece::Pawn);
    let mut f = Features::default();

    for file in 0..File::COUNT {
        let n = (ours & Bitboard::from(0x0101_0101_0101_0101u64 << file)).len();
        if n > 1 {
            f.doubled += 1;
        }
        if n > 2 {
            f.tripled += 1;
        }
    }

    for sq in ours {
        let file = Bitboard::from(sq.file());
        let adjacent = file.shift(Direction::East) | file.shift(Direction::West);
        let front = Bitboard::from(sq).front_span(us);
        let ahead = front.shift(Direction::East) | front.shift(Direction::West);

        if (front | ahead).is_disjoint(theirs) {
            f.passed += 1;
        }

        if adjacent.is_disjoint(ours) {
            f.isolated += 1;
        } else if (adjacent & ours & !ahead).is_empty() {
            // every neighbour has already advanced past it
            let stop = sq.offset(0, us.forward());
            if stop.map_or(false, |stop| pawn_attacks(us, stop).intersects(theirs)) {
                f.backward += 1;
            }
        }
    }

    f
}

fn analyze(pos: &Position, weights: &Weights) -> PawnEntry {
    let mut scores = [0; Phase::COUNT];

    for &color in Color::ALL.iter() {
        let f = features(pos, color);
        let sign = if color == Color::White { 1 } else { -1 };

        for &phase in Phase::ALL.iter() {
            let w = weights.phase(phase);
            scores[phase as usize] += sign * (
                f.doubled * i32::from(w.doubled_pawn)
                + f.tripled * i32::from(w.tripled_pawn)
                + f.isolated * i32::from(w.isolated_pawn)
                + f.backward * i32::from(w.backward_pawn)
                + f.passed * i32::from(w.passed_pawn)
            );
        }
    }

    PawnEntry { key: pos.pawn_key(), scores }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features_of(fen: &str, color: Color) -> Features {
        features(&Position::from_fen_str(fen).expect("valid"), color)
    }

    #[test]
    fn finds_doubled_tripled_and_isolated_pawns() {
        let f = features_of("4k3/8/8/8/P7/P7/P3P3/4K3 w - - 0 1", Color::White);
        assert_eq!(f.doubled, 1);
        assert_eq!(f.tripled, 1);
        assert_eq!(f.isolated, 4);
    }

    #[test]
    fn finds_passed_pawns() {
        // the a-pawn is passed, the c6 pawn stops the d-pawn
        let f = features_of("4k3/8/2p5/8/P2P4/8/8/4K3 w - - 0 1", Color::White);
        assert_eq!(f.passed, 1);
        let f = features_of("4k3/8/2p5/8/P2P4/8/8/4K3 w - - 0 1", Color::Black);
        assert_eq!(f.passed, 0);
    }

    #[test]
    fn finds_backward_pawns() {
        // d3 cannot be supported by c4 and d4 is controlled by the e5 pawn
        let f = features_of("4k3/8/8/4p3/2P5/3P4/8/4K3 w - - 0 1", Color::White);
        assert_eq!(f.backward, 1);
        assert_eq!(f.isolated, 0);
    }

    #[test]
    fn cached_scores_match_fresh_ones() {
        let weights = Weights::default();
        let mut table = PawnTable::new();
        let pos = Position::from_fen_str("4k3/pp4p1/8/8/P7/P7/P3P3/4K3 w - - 0 1").expect("valid");

        let first = table.entry(&pos, &weights);
        assert_eq!(first, analyze(&pos, &weights));
        assert_eq!(table.entry(&pos, &weights), first);
        assert_ne!(first.score(Phase::Endgame), 0);
    }
}
