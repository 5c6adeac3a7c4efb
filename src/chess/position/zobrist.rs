//! Contains structure and data for Zobrist hash keys
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::fmt;
use lazy_static::lazy_static;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use super::*;

// fixed so that keys, and therefore hash table contents, are reproducible between runs
const SEED: u64 = 0x7363_6172_6563_726f;

struct ZobristKeys {
    pieces: [[[u64; Square::COUNT]; Piece::COUNT]; Color::COUNT],
    castling: [u64; CastlingRights::COMBINATIONS],
    ep_file: [u64; File::COUNT],
    black_to_move: u64,
}

lazy_static! {
    static ref KEYS: ZobristKeys = ZobristKeys::new();
}

impl ZobristKeys {
    fn new() -> ZobristKeys {
        let mut rng = StdRng::seed_from_u64(SEED);
        let mut keys = ZobristKeys {
            pieces: [[[0; Square::COUNT]; Piece::COUNT]; Color::COUNT],
            castling: [0; CastlingRights::COMBINATIONS],
            ep_file: [0; File::COUNT],
            black_to_move: 0,
        };

        for color in keys.pieces.iter_mut() {
            for piece in color.iter_mut() {
                for key in piece.iter_mut() {
                    *key = rng.gen();
                }
            }
        }
        // no rights, no key
        for key in keys.castling.iter_mut().skip(1) {
            *key = rng.gen();
        }
        for key in keys.ep_file.iter_mut() {
            *key = rng.gen();
        }
        keys.black_to_move = rng.gen();

        keys
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// A 64-bit hash key generated from a position
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Zobrist(u64);

impl Zobrist {
    /// Creates a new zobrist key
    pub fn new() -> Zobrist {
        Zobrist(0)
    }

    /// Toggles piece placement
    pub fn toggle_piece(&mut self, c: Color, p: Piece, sq: Square) {
        self.0 ^= KEYS.pieces[c as usize][p as usize][sq as usize];
    }

    /// Toggles an en passant square
    pub fn toggle_ep_square(&mut self, sq: Square) {
        self.0 ^= KEYS.ep_file[sq.file() as usize];
    }

    /// Toggles a complete set of castling rights
    pub fn toggle_castling_rights(&mut self, rights: CastlingRights) {
        self.0 ^= KEYS.castling[rights.bits() as usize];
    }

    /// Toggles whose turn it is
    pub fn toggle_turn(&mut self) {
        self.0 ^= KEYS.black_to_move;
    }
}

impl fmt::Display for Zobrist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::UpperHex for Zobrist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

impl fmt::LowerHex for Zobrist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<Zobrist> for u64 {
    /// Allows using the key to get a hash table index
    ///
    /// # Example
    /// ```rust
    /// use scarecrow::chess::Position;
    ///
    /// let pos = Position::new();
    /// let hash_table_size: usize = 0x10_0000;
    /// let index = u64::from(pos.zobrist_key()) as usize & (hash_table_size - 1);
    /// ```
    fn from(key: Zobrist) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_twice_restores_the_key() {
        let mut key = Zobrist::new();
        key.toggle_piece(Color::White, Piece::Knight, Square::G1);
        assert_ne!(key, Zobrist::new());
        key.toggle_piece(Color::White, Piece::Knight, Square::G1);
        assert_eq!(key, Zobrist::new());

        key.toggle_turn();
        key.toggle_turn();
        key.toggle_ep_square(Square::E3);
        key.toggle_ep_square(Square::E6);
        assert_eq!(key, Zobrist::new());
    }

    #[test]
    fn empty_castling_rights_have_no_key() {
        let mut key = Zobrist::new();
        key.toggle_castling_rights(CastlingRights::NONE);
        assert_eq!(key, Zobrist::new());
        key.toggle_castling_rights(CastlingRights::ALL);
        assert_ne!(key, Zobrist::new());
    }

    #[test]
    fn piece_keys_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for c in Color::ALL.iter() {
            for p in Piece::ALL.iter() {
                for sq in Square::all() {
                    let mut key = Zobrist::new();
                    key.toggle_piece(*c, *p, sq);
                    assert!(seen.insert(u64::from(key)));
                }
            }
        }
    }
}
