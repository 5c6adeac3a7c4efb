//! Special evaluation of endgames known by their material
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use crate::chess::{Color, File, Piece, Position, Square, MAX_PLY};
use crate::chess::bitboard::Bitboard;
use super::Score;
use super::bitbase;

// bonus for driving the weak king toward the edge
const PUSH_TO_EDGE: [i16; Square::COUNT] = [
    100,  90,  80,  70,  70,  80,  90, 100,
     90,  60,  50,  40,  40,  50,  60,  90,
     80,  50,  30,  20,  20,  30,  50,  80,
     70,  40,  20,  10,  10,  20,  40,  70,
     70,  40,  20,  10,  10,  20,  40,  70,
     80,  50,  30,  20,  20,  30,  50,  80,
     90,  60,  50,  40,  40,  50,  60,  90,
    100,  90,  80,  70,  70,  80,  90, 100,
];

// bonus for bringing the kings together, indexed by distance
const PUSH_CLOSE: [i16; 8] = [0, 7, 6, 5, 4, 3, 2, 1];

/// Evaluates a position scored by pattern rather than by the general evaluator, from the point
/// of view of the side to move. Returns `None` if no pattern applies.
///
/// When neither king is bare, only queen against rook is recognized. Otherwise patterns are tried
/// in order of specificity: king and pawn, king bishop and knight, wrong rook pawn, insufficient
/// material, and finally any other material.
pub fn evaluate(pos: &Position) -> Option<Score> {
    let strong = match (is_bare(pos, Color::White), is_bare(pos, Color::Black)) {
        (true, true) => return Some(Score::draw()),
        (false, true) => Color::White,
        (true, false) => Color::Black,
        (false, false) => {
            return Color::ALL.iter().find_map(|&strong| {
                kqkr(pos, strong).map(|value| from_side_to_move(pos, strong, value))
            });
        },
    };

    let value = kpk(pos, strong)
        .or_else(|| kbnk(pos, strong))
        .or_else(|| wrong_rook_pawn(pos, strong))
        .or_else(|| insufficient_material(pos, strong))
        .unwrap_or_else(|| kxk(pos, strong));

    Some(from_side_to_move(pos, strong, value))
}

fn from_side_to_move(pos: &Position, strong: Color, value: Score) -> Score {
    if pos.turn() == strong { value } else { -value }
}

fn is_bare(pos: &Position, c: Color) -> bool {
    pos.occupied_by(c).len() == 1
}

/// Counts of each non-king piece kind
fn material(pos: &Position, c: Color) -> [usize; Piece::COUNT] {
    let mut counts = [0; Piece::COUNT];
    for &piece in Piece::ALL.iter() {
        counts[piece as usize] = pos.piece_count(c, piece);
    }
    counts[Piece::King as usize] = 0;
    counts
}

fn only(pos: &Position, c: Color, wanted: &[(Piece, usize)]) -> bool {
    let mut expected = [0; Piece::COUNT];
    for &(piece, n) in wanted {
        expected[piece as usize] = n;
    }
    material(pos, c) == expected
}

/// King and pawn against king, decided by the bitbase
fn kpk(pos: &Position, strong: Color) -> Option<Score> {
    if !only(pos, strong, &[(Piece::Pawn, 1)]) {
        return None;
    }

    let pawn = pos.piece_square(strong, Piece::Pawn, 0)?;
    let won = bitbase::is_win(strong, pos.turn(), pos.king_square(strong), pawn,
        pos.king_square(!strong));

    if won {
        Some(Score::known_win() + strong.relative_rank(pawn.rank()) as i16)
    } else {
        Some(Score::draw())
    }
}

/// King, bishop and knight against king: mate can only be forced in a corner of the bishop's
/// color
fn kbnk(pos: &Position, strong: Color) -> Option<Score> {
    if !only(pos, strong, &[(Piece::Knight, 1), (Piece::Bishop, 1)]) {
        return None;
    }

    let bishop = pos.piece_square(strong, Piece::Bishop, 0)?;
    let weak_king = pos.king_square(!strong);
    let strong_king = pos.king_square(strong);
    let corners = if bishop.is_light() {
        [Square::H1, Square::A8]
    } else {
        [Square::A1, Square::H8]
    };
    let corner_distance = corners.iter().map(|&c| weak_king.distance(c)).min().unwrap_or(7);

    Some(Score::known_win()
        + 600
        + 40 * (7 - i16::from(corner_distance))
        + PUSH_CLOSE[strong_king.distance(weak_king) as usize])
}

/// Bishop and pawns on a single rook file, where the bishop does not control the promotion
/// square and the defending king has reached the corner
fn wrong_rook_pawn(pos: &Position, strong: Color) -> Option<Score> {
    let m = material(pos, strong);
    if m[Piece::Bishop as usize] == 0 || m[Piece::Pawn as usize] == 0
        || m[Piece::Knight as usize] + m[Piece::Rook as usize] + m[Piece::Queen as usize] > 0 {
        return None;
    }

    let pawns = pos.pieces(strong, Piece::Pawn);
    let file = if pawns.is_disjoint(!Bitboard::from(File::A)) {
        File::A
    } else if pawns.is_disjoint(!Bitboard::from(File::H)) {
        File::H
    } else {
        return None;
    };

    let corner = match file {
        File::A => Square::A8,
        _ => Square::H8,
    }.relative_to(strong);
    let corner_color = if corner.is_light() {
        Bitboard::LIGHT_SQUARES
    } else {
        Bitboard::DARK_SQUARES
    };

    if pos.pieces(strong, Piece::Bishop).is_disjoint(corner_color)
        && pos.king_square(!strong).distance(corner) <= 1 {
        Some(Score::draw())
    } else {
        None
    }
}

/// Lone minor pieces that cannot force mate
fn insufficient_material(pos: &Position, strong: Color) -> Option<Score> {
    if pos.has_insufficient_material() || only(pos, strong, &[(Piece::Knight, 2)]) {
        Some(Score::draw())
    } else {
        None
    }
}

/// Queen against rook: won, but only by driving the defending king to the edge
fn kqkr(pos: &Position, strong: Color) -> Option<Score> {
    if !only(pos, strong, &[(Piece::Queen, 1)]) || !only(pos, !strong, &[(Piece::Rook, 1)]) {
        return None;
    }

    let weak_king = pos.king_square(!strong);
    let strong_king = pos.king_square(strong);

    Some(Score::known_win()
        + (900 - 500)
        + PUSH_TO_EDGE[weak_king as usize]
        + PUSH_CLOSE[strong_king.distance(weak_king) as usize])
}

/// Anything else against a bare king: material, driving the king to the edge, and bringing the
/// kings together
fn kxk(pos: &Position, strong: Color) -> Score {
    use Piece::*;

    let m = material(pos, strong);
    let weak_king = pos.king_square(!strong);
    let strong_king = pos.king_square(strong);

    let mut v: i32 = 100 * m[Pawn as usize] as i32
        + 300 * m[Knight as usize] as i32
        + 300 * m[Bishop as usize] as i32
        + 500 * m[Rook as usize] as i32
        + 900 * m[Queen as usize] as i32;
    for sq in pos.pieces(strong, Pawn) {
        v += strong.relative_rank(sq.rank()) as i32;
    }
    v += i32::from(PUSH_TO_EDGE[weak_king as usize]);
    v += i32::from(PUSH_CLOSE[strong_king.distance(weak_king) as usize]);
    v += i32::from(i16::from(Score::known_win()));

    let cap = i32::from(i16::from(Score::mates_in(MAX_PLY))) - 1;
    Score::from(v.min(cap) as i16)
}
