//! Provides data and functions used to compute attacks
//
//  Copyright 2019 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use lazy_static::lazy_static;
use super::*;

/// Precomputed attack data, built once on first use and shared read-only afterwards
struct AttackTables {
    knight: [Bitboard; Square::COUNT],
    king: [Bitboard; Square::COUNT],
    pawn: [[Bitboard; Square::COUNT]; Color::COUNT],
    rays: [[Bitboard; Square::COUNT]; Direction::COUNT],
    between: Vec<[Bitboard; Square::COUNT]>,
    line: Vec<[Bitboard; Square::COUNT]>,
}

lazy_static! {
    static ref TABLES: AttackTables = AttackTables::new();
}

const KNIGHT_STEPS: [(i8, i8); 8] = [
    (1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1), (-2, 1), (-1, 2),
];

impl AttackTables {
    fn new() -> AttackTables {
        let mut tables = AttackTables {
            knight: [Bitboard::EMPTY; Square::COUNT],
            king: [Bitboard::EMPTY; Square::COUNT],
            pawn: [[Bitboard::EMPTY; Square::COUNT]; Color::COUNT],
            rays: [[Bitboard::EMPTY; Square::COUNT]; Direction::COUNT],
            between: vec![[Bitboard::EMPTY; Square::COUNT]; Square::COUNT],
            line: vec![[Bitboard::EMPTY; Square::COUNT]; Square::COUNT],
        };

        for sq in Square::all() {
            let s = sq as usize;

            for &(x, y) in KNIGHT_STEPS.iter() {
                if let Some(to) = sq.offset(x, y) {
                    tables.knight[s].insert(to);
                }
            }

            for &dir in Direction::ALL.iter() {
                let (x, y) = dir.step();
                if let Some(to) = sq.offset(x, y) {
                    tables.king[s].insert(to);
                }

                let mut next = sq.offset(x, y);
                while let Some(to) = next {
                    tables.rays[dir as usize][s].insert(to);
                    next = to.offset(x, y);
                }
            }

            for &color in Color::ALL.iter() {
                for &x in [-1, 1].iter() {
                    if let Some(to) = sq.offset(x, color.forward()) {
                        tables.pawn[color as usize][s].insert(to);
                    }
                }
            }
        }

        for a in Square::all() {
            for &dir in Direction::ALL.iter() {
                let ray = tables.rays[dir as usize][a as usize];
                let back = tables.rays[dir.opposite() as usize][a as usize];
                for b in ray {
                    let beyond = tables.rays[dir as usize][b as usize];
                    tables.between[a as usize][b as usize] = ray & !beyond & !Bitboard::from(b);
                    tables.line[a as usize][b as usize] = ray | back | a.into();
                }
            }
        }

        tables
    }
}

/// Returns every square reached from `sq` by moving in direction `dir` on an empty board,
/// not including `sq` itself
#[inline]
pub fn ray(dir: Direction, sq: Square) -> Bitboard {
    TABLES.rays[dir as usize][sq as usize]
}

/// Returns the squares strictly between `a` and `b` if they share a rank, file or diagonal,
/// and the empty set otherwise
///
/// ```rust
/// use scarecrow::chess::Square;
/// use scarecrow::chess::bitboard::between;
///
/// assert_eq!(between(Square::A1, Square::D4).len(), 2);
/// assert!(between(Square::A1, Square::B3).is_empty());
/// assert!(between(Square::E1, Square::E2).is_empty());
/// ```
#[inline]
pub fn between(a: Square, b: Square) -> Bitboard {
    TABLES.between[a as usize][b as usize]
}

/// Returns the full line through `a` and `b`, edge to edge, if they share a rank, file or
/// diagonal, and the empty set otherwise
#[inline]
pub fn line(a: Square, b: Square) -> Bitboard {
    TABLES.line[a as usize][b as usize]
}

/// Computes the attacks along a single ray, stopping at (and including) the first blocker
fn slide(dir: Direction, sq: Square, occ: Bitboard) -> Bitboard {
    let attacks = ray(dir, sq);
    let blockers = attacks & occ;
    let first = if dir.is_positive() { blockers.lsb() } else { blockers.msb() };

    match first {
        Some(b) => attacks & !ray(dir, b),
        None => attacks,
    }
}

/// Computes knight-like attacks to or from `sq`
#[inline]
pub fn knight_attacks(sq: Square) -> Bitboard {
    TABLES.knight[sq as usize]
}

/// Computes king-like attacks to or from `sq`
#[inline]
pub fn king_attacks(sq: Square) -> Bitboard {
    TABLES.king[sq as usize]
}

/// Computes the squares attacked by a pawn of the given color standing on `sq`. Because pawn
/// attacks are not symmetric, the squares from which a `color` pawn attacks `sq` are given by
/// `pawn_attacks(!color, sq)`.
#[inline]
pub fn pawn_attacks(color: Color, sq: Square) -> Bitboard {
    TABLES.pawn[color as usize][sq as usize]
}

/// Computes bishop-like attacks to or from `sq` based on the occupied squares
/// given by `occ`
pub fn bishop_attacks(sq: Square, occ: Bitboard) -> Bitboard {
    use Direction::*;

    slide(NorthEast, sq, occ) | slide(SouthEast, sq, occ)
        | slide(SouthWest, sq, occ) | slide(NorthWest, sq, occ)
}

/// Computes rook-like attacks to or from `sq` based on the occupied squares
/// given by `occ`
pub fn rook_attacks(sq: Square, occ: Bitboard) -> Bitboard {
    use Direction::*;

    slide(North, sq, occ) | slide(East, sq, occ) | slide(South, sq, occ) | slide(West, sq, occ)
}

/// Computes queen-like attacks to or from square based on the occupied squares
/// given by `occ`
#[inline]
pub fn queen_attacks(sq: Square, occ: Bitboard) -> Bitboard {
    rook_attacks(sq, occ) | bishop_attacks(sq, occ)
}

/// Computes the attacks of any piece. `color` only matters for pawns, and `occ` only for
/// sliding pieces.
pub fn piece_attacks(piece: Piece, color: Color, sq: Square, occ: Bitboard) -> Bitboard {
    match piece {
        Piece::Pawn => pawn_attacks(color, sq),
        Piece::Knight => knight_attacks(sq),
        Piece::Bishop => bishop_attacks(sq, occ),
        Piece::Rook => rook_attacks(sq, occ),
        Piece::Queen => queen_attacks(sq, occ),
        Piece::King => king_attacks(sq),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_attacks() {
        assert_eq!(knight_attacks(Square::A1), Bitboard::from(Square::B3) | Square::C2.into());
        assert_eq!(knight_attacks(Square::E4).len(), 8);
        assert_eq!(king_attacks(Square::A1).len(), 3);
        assert_eq!(king_attacks(Square::E4).len(), 8);
        assert_eq!(king_attacks(Square::H5).len(), 5);
    }

    #[test]
    fn pawn_attacks_depend_on_color() {
        assert_eq!(pawn_attacks(Color::White, Square::E4),
            Bitboard::from(Square::D5) | Square::F5.into());
        assert_eq!(pawn_attacks(Color::Black, Square::E4),
            Bitboard::from(Square::D3) | Square::F3.into());
        assert_eq!(pawn_attacks(Color::White, Square::A2), Square::B3.into());
        assert!(pawn_attacks(Color::White, Square::C8).is_empty());
    }

    #[test]
    fn sliding_attacks_stop_at_blockers() {
        let occ = Bitboard::from(Square::D6) | Square::F4.into() | Square::B2.into();
        let rook = rook_attacks(Square::D4, occ);
        assert!(rook.contains(Square::D6));
        assert!(!rook.contains(Square::D7));
        assert!(rook.contains(Square::F4));
        assert!(!rook.contains(Square::G4));
        assert!(rook.contains(Square::A4));
        assert!(rook.contains(Square::D1));
        assert_eq!(rook.len(), 2 + 2 + 3 + 3);

        let bishop = bishop_attacks(Square::D4, occ);
        assert!(bishop.contains(Square::B2));
        assert!(!bishop.contains(Square::A1));
        assert!(bishop.contains(Square::H8));
        assert!(bishop.contains(Square::A7));
        assert!(bishop.contains(Square::G1));

        assert_eq!(queen_attacks(Square::D4, occ), rook | bishop);
        assert_eq!(rook_attacks(Square::A1, Bitboard::new()).len(), 14);
        assert_eq!(bishop_attacks(Square::A1, Bitboard::new()).len(), 7);
    }

    #[test]
    fn between_and_line() {
        assert_eq!(between(Square::A1, Square::H8).len(), 6);
        assert_eq!(between(Square::H8, Square::A1), between(Square::A1, Square::H8));
        assert_eq!(between(Square::E1, Square::H1),
            Bitboard::from(Square::F1) | Square::G1.into());
        assert!(between(Square::A1, Square::A1).is_empty());
        assert!(between(Square::A1, Square::C2).is_empty());

        assert_eq!(line(Square::C3, Square::E5).len(), 8);
        assert!(line(Square::C3, Square::E5).contains(Square::A1));
        assert!(line(Square::C3, Square::E5).contains(Square::H8));
        assert_eq!(line(Square::B4, Square::G4), Rank::R4.into());
        assert!(line(Square::A1, Square::B3).is_empty());
    }

    #[test]
    fn rays() {
        assert_eq!(ray(Direction::North, Square::E4).len(), 4);
        assert_eq!(ray(Direction::SouthWest, Square::E4).len(), 3);
        assert!(ray(Direction::East, Square::H3).is_empty());
    }
}
