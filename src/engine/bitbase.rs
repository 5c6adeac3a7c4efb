//! King and pawn versus king bitbase
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
//! Positions are stored with White as the side with the pawn, and the pawn on files A to D. Every
//! other position is reflected into that form before lookup.
use std::convert::TryFrom;
use std::sync::atomic::{AtomicBool, Ordering};
use lazy_static::lazy_static;
use log::debug;
use crate::chess::{Color, File, Rank, Square};
use crate::chess::bitboard::{king_attacks, pawn_attacks};

// 2 sides * 24 pawn squares * 64 * 64 king squares
const MAX_INDEX: usize = 2 * 24 * 64 * 64;

lazy_static! {
    static ref BITBASE: Vec<u64> = generate();
}

static READY: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Outcome {
    Invalid,
    Unknown,
    Win,
    Draw,
}

/// Index bits: white king 0-5, black king 6-11, side to move 12, pawn file 13-14, pawn rank
/// (less 2) 15-17
fn index(side: Color, white_king: Square, black_king: Square, pawn: Square) -> usize {
    debug_assert!(pawn.file() <= File::D);
    debug_assert!(pawn.rank() >= Rank::R2 && pawn.rank() <= Rank::R7);

    white_king as usize
        | (black_king as usize) << 6
        | (side as usize) << 12
        | (pawn.file() as usize) << 13
        | (pawn.rank() as usize - Rank::R2 as usize) << 15
}

fn decode(idx: usize) -> (Color, Square, Square, Square) {
    let square = |n: usize| Square::try_from(n).expect("INFALLIBLE");
    let side = if idx >> 12 & 1 == 0 { Color::White } else { Color::Black };
    let file = idx >> 13 & 0x3;
    let rank = (idx >> 15 & 0x7) + Rank::R2 as usize;

    (side, square(idx & 0x3f), square(idx >> 6 & 0x3f), square(rank * 8 + file))
}

/// Classifies the positions that can be decided without looking at any moves
fn initial_outcome(idx: usize) -> Outcome {
    let (side, white_king, black_king, pawn) = decode(idx);
    let black_in_check = pawn_attacks(Color::White, pawn).contains(black_king);

    if white_king.distance(black_king) <= 1
        || white_king == pawn
        || black_king == pawn
        || (side == Color::White && black_in_check) {
        return Outcome::Invalid;
    }

    let black_moves = king_attacks(black_king)
        & !king_attacks(white_king)
        & !pawn_attacks(Color::White, pawn);

    if side == Color::Black && black_moves.is_empty() {
        return if black_in_check { Outcome::Win } else { Outcome::Draw };
    }

    let next = pawn.offset(0, 1).expect("INFALLIBLE");
    if side == Color::White
        && pawn.rank() == Rank::R7
        && white_king != next
        && black_king != next
        && !black_moves.contains(next) {
        return Outcome::Win;
    }

    // an undefended pawn is captured
    if side == Color::Black && black_moves.contains(pawn) {
        return Outcome::Draw;
    }

    Outcome::Unknown
}

/// Classifies a position from the outcomes of its successors, returning `Unknown` if that isn't
/// possible yet
fn update_outcome(results: &[Outcome], idx: usize) -> Outcome {
    let (side, white_king, black_king, pawn) = decode(idx);
    let (better, worse) = match side {
        Color::White => (Outcome::Win, Outcome::Draw),
        Color::Black => (Outcome::Draw, Outcome::Win),
    };
    let mut unknown = false;
    let mut decides = |next: usize| match results[next] {
        r if r == better => true,
        Outcome::Unknown => {
            unknown = true;
            false
        },
        _ => false,
    };

    match side {
        Color::White => {
            for to in king_attacks(white_king) {
                if decides(index(Color::Black, to, black_king, pawn)) {
                    return better;
                }
            }
            if pawn.rank() != Rank::R7 {
                let one = pawn.offset(0, 1).expect("INFALLIBLE");
                if decides(index(Color::Black, white_king, black_king, one)) {
                    return better;
                }

                if pawn.rank() == Rank::R2 && one != white_king && one != black_king {
                    let two = pawn.offset(0, 2).expect("INFALLIBLE");
                    if decides(index(Color::Black, white_king, black_king, two)) {
                        return better;
                    }
                }
            }
        },
        Color::Black => {
            for to in king_attacks(black_king) {
                if decides(index(Color::White, white_king, to, pawn)) {
                    return better;
                }
            }
        },
    }

    if unknown { Outcome::Unknown } else { worse }
}

fn generate() -> Vec<u64> {
    let mut results: Vec<Outcome> = (0..MAX_INDEX).map(initial_outcome).collect();

    let mut passes = 0;
    let mut repeat = true;
    while repeat {
        repeat = false;
        passes += 1;
        for idx in 0..MAX_INDEX {
            if results[idx] == Outcome::Unknown {
                results[idx] = update_outcome(&results, idx);
                repeat |= results[idx] != Outcome::Unknown;
            }
        }
    }
    debug!("KPK bitbase solved in {} passes", passes);

    let mut bits = vec![0u64; MAX_INDEX / 64];
    for (idx, &result) in results.iter().enumerate() {
        if result == Outcome::Win {
            bits[idx / 64] |= 1 << (idx % 64);
        }
    }
    READY.store(true, Ordering::Release);
    bits
}

/// Builds the bitbase now instead of on first use. Does nothing if it's already built.
pub fn init() {
    lazy_static::initialize(&BITBASE);
}

/// Returns `true` once the bitbase has been built
pub fn is_ready() -> bool {
    READY.load(Ordering::Acquire)
}

/// Returns `true` if the side with the pawn wins, with `side` to move
pub fn is_win(strong: Color, side: Color, strong_king: Square, strong_pawn: Square,
    weak_king: Square)
-> bool {
    let (mut side, mut strong_king, mut strong_pawn, mut weak_king) =
        (side, strong_king, strong_pawn, weak_king);

    if strong_pawn.file() > File::D {
        strong_king = strong_king.flip_file();
        strong_pawn = strong_pawn.flip_file();
        weak_king = weak_king.flip_file();
    }
    if strong == Color::Black {
        strong_king = strong_king.flip_rank();
        strong_pawn = strong_pawn.flip_rank();
        weak_king = weak_king.flip_rank();
        side = !side;
    }

    let idx = index(side, strong_king, weak_king, strong_pawn);
    BITBASE[idx / 64] & 1 << (idx % 64) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wins(side: Color, wk: Square, wp: Square, bk: Square) -> bool {
        is_win(Color::White, side, wk, wp, bk)
    }

    #[test]
    fn index_round_trips() {
        let idx = index(Color::Black, Square::E1, Square::H8, Square::D7);
        assert_eq!(decode(idx), (Color::Black, Square::E1, Square::H8, Square::D7));
    }

    #[test]
    fn rook_pawn_with_king_in_the_corner_is_a_draw() {
        for &side in Color::ALL.iter() {
            assert!(!wins(side, Square::H1, Square::A2, Square::A8));
            assert!(!wins(side, Square::B6, Square::A5, Square::A8));
        }
    }

    #[test]
    fn king_on_the_sixth_in_front_of_the_pawn_wins() {
        for &side in Color::ALL.iter() {
            assert!(wins(side, Square::E6, Square::E5, Square::E8));
        }
    }

    #[test]
    fn pawn_outside_the_square_wins() {
        for &side in Color::ALL.iter() {
            assert!(wins(side, Square::A1, Square::E6, Square::A8));
        }
    }

    #[test]
    fn undefended_pawn_is_lost() {
        assert!(!wins(Color::Black, Square::H1, Square::B2, Square::A2));
    }

    #[test]
    fn opposition_decides_king_in_front() {
        // the side to move gives up the opposition
        assert!(wins(Color::Black, Square::E5, Square::E4, Square::E7));
        assert!(!wins(Color::White, Square::E5, Square::E4, Square::E7));
    }

    #[test]
    fn rook_pawn_with_the_king_in_front_is_a_draw() {
        for &side in Color::ALL.iter() {
            assert!(!wins(side, Square::C6, Square::A6, Square::A8));
            assert!(!wins(side, Square::G5, Square::H4, Square::H7));
        }
    }

    #[test]
    fn king_two_squares_in_front_wins_with_a_spare_tempo() {
        for &side in Color::ALL.iter() {
            assert!(wins(side, Square::E5, Square::E3, Square::E7));
        }
    }

    #[test]
    fn stalemate_saves_the_defender() {
        // with Black to move it's already stalemate
        assert!(!wins(Color::Black, Square::E6, Square::E7, Square::E8));
        assert!(wins(Color::White, Square::E6, Square::E7, Square::E8));
    }

    #[test]
    fn init_builds_the_table() {
        init();
        init();
        assert!(is_ready());
    }

    #[test]
    fn black_pawn_is_mirrored() {
        for &side in Color::ALL.iter() {
            assert!(is_win(Color::Black, side, Square::H8, Square::D3, Square::H1));
            assert!(!is_win(Color::Black, side, Square::A8, Square::H7, Square::H1));
        }
    }
}
