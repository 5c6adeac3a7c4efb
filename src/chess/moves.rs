//! Contains structures to represent moves and to store the moves generated at each ply
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::num::NonZeroU16;
use std::ops::{Index, IndexMut};
use std::convert::TryFrom;
use std::fmt;
use super::*;

/// The largest number of moves the generator will ever store for a single position
pub const MAX_MOVES: usize = 256;

/// The deepest ply the search (quiescence included) can reach
pub const MAX_PLY: usize = 128;

const FROM_MASK: u16 = 0o77;
const TO_SHIFT: u16 = 6;
const PROMOTION_SHIFT: u16 = 12;
const PROMOTION_MASK: u16 = 0b111;
const CASTLING_FLAG: u16 = 1 << 15;

////////////////////////////////////////////////////////////////////////////////////////////////////
/// A move encoded in 16 bits: origin, destination, promotion piece and castling flag.
///
/// A `Move` says nothing about what was captured or what state the position was in before the
/// move; that is returned as a [`MoveInfo`](struct.MoveInfo.html) by `Position::do_move`.
/// Castling is encoded as the king's move, so `e1g1` is white's king-side castle.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Move(NonZeroU16);

impl Move {
    fn from_bits(bits: u16) -> Move {
        // origin and destination always differ, so the low twelve bits are never all zero
        debug_assert!(bits & 0o7777 != 0);
        Move(unsafe { NonZeroU16::new_unchecked(bits) })
    }

    /// Creates a normal move (including captures and en-passant captures)
    pub fn new(from: Square, to: Square) -> Move {
        Move::from_bits(from as u16 | (to as u16) << TO_SHIFT)
    }

    /// Creates a pawn promotion to `piece`, which must be a knight, bishop, rook or queen
    pub fn new_promotion(from: Square, to: Square, piece: Piece) -> Move {
        debug_assert!(piece != Piece::Pawn && piece != Piece::King);
        Move::from_bits(Move::new(from, to).bits() | (piece as u16) << PROMOTION_SHIFT)
    }

    /// Creates a castling move, given the king's origin and destination
    pub fn new_castling(from: Square, to: Square) -> Move {
        Move::from_bits(Move::new(from, to).bits() | CASTLING_FLAG)
    }

    /// Returns the raw 16-bit encoding of the move
    pub fn bits(self) -> u16 {
        self.0.get()
    }

    /// Rebuilds a move from its raw encoding, if the encoding is valid
    pub fn from_raw(bits: u16) -> Option<Move> {
        let prom = (bits >> PROMOTION_SHIFT) & PROMOTION_MASK;
        if prom > Piece::Queen as u16 || bits & FROM_MASK == (bits >> TO_SHIFT) & FROM_MASK {
            None
        } else {
            NonZeroU16::new(bits).map(Move)
        }
    }

    /// Returns the origin of the moved piece
    pub fn from(self) -> Square {
        Square::try_from((self.bits() & FROM_MASK) as usize).expect("INFALLIBLE")
    }

    /// Returns the destination of the moved piece
    pub fn to(self) -> Square {
        Square::try_from(((self.bits() >> TO_SHIFT) & FROM_MASK) as usize).expect("INFALLIBLE")
    }

    /// Returns the promotion piece, if any
    pub fn promotion(self) -> Option<Piece> {
        match (self.bits() >> PROMOTION_SHIFT) & PROMOTION_MASK {
            0 => None,
            p => Piece::try_from(p as usize).ok(),
        }
    }

    /// Returns `true` if the move is a promotion
    pub fn is_promotion(self) -> bool {
        (self.bits() >> PROMOTION_SHIFT) & PROMOTION_MASK != 0
    }

    /// Returns `true` if the move is castling
    pub fn is_castling(self) -> bool {
        self.bits() & CASTLING_FLAG != 0
    }
}

impl fmt::Display for Move {
    /// Formats the move in coordinate notation, as used by UCI (`e2e4`, `e7e8q`)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from(), self.to())?;
        if let Some(piece) = self.promotion() {
            write!(f, "{}", piece.to_char(Color::Black))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({}{})", self, if self.is_castling() { ", castling" } else { "" })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Everything `Position::do_move` changes that cannot be recovered from the move itself.
///
/// Must be passed back, unchanged, to the matching `Position::undo_move`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MoveInfo {
    /// The kind of piece captured, if any (a pawn for en-passant captures)
    pub captured: Option<Piece>,
    /// Castling rights before the move
    pub castling: CastlingRights,
    /// En-passant square before the move
    pub ep_square: Option<Square>,
    /// `true` if the move was an en-passant capture
    pub en_passant: bool,
    /// Halfmove clock before the move
    pub halfmove_clock: u16,
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// A fixed-capacity list of moves with a score for each move, used by the move picker.
#[derive(Clone)]
pub struct MoveList {
    moves: [Move; MAX_MOVES],
    scores: [i32; MAX_MOVES],
    len: usize,
}

// placeholder for unused slots, never read
const FILLER: Move = Move(unsafe { NonZeroU16::new_unchecked(0xffff) });

impl MoveList {
    /// Creates an empty move list
    pub fn new() -> MoveList {
        MoveList { moves: [FILLER; MAX_MOVES], scores: [0; MAX_MOVES], len: 0 }
    }

    /// Returns the number of moves in the list
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list holds no moves
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every move from the list
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Appends a move with a score of zero
    pub fn push(&mut self, mv: Move) {
        debug_assert!(self.len < MAX_MOVES);
        self.moves[self.len] = mv;
        self.scores[self.len] = 0;
        self.len += 1;
    }

    /// Returns the moves as a slice
    pub fn as_slice(&self) -> &[Move] {
        &self.moves[..self.len]
    }

    /// Returns an iterator over the moves
    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.as_slice().iter()
    }

    /// Returns `true` if `mv` is in the list
    pub fn contains(&self, mv: Move) -> bool {
        self.as_slice().contains(&mv)
    }

    /// Returns the score of the move at `index`
    pub fn score(&self, index: usize) -> i32 {
        self.scores[index]
    }

    /// Sets the score of the move at `index`
    pub fn set_score(&mut self, index: usize, score: i32) {
        self.scores[index] = score;
    }

    /// Keeps only the moves for which `keep` returns `true`, preserving their order
    pub fn retain<F: FnMut(Move) -> bool>(&mut self, mut keep: F) {
        let mut kept = 0;
        for i in 0..self.len {
            if keep(self.moves[i]) {
                self.moves[kept] = self.moves[i];
                self.scores[kept] = self.scores[i];
                kept += 1;
            }
        }
        self.len = kept;
    }

    /// Moves the best scoring move among those at `index` and after into position `index`, and
    /// returns it. Calling this for `index = 0, 1, 2, ...` visits the moves best first.
    pub fn pick(&mut self, index: usize) -> Move {
        let mut best = index;
        for i in index + 1..self.len {
            if self.scores[i] > self.scores[best] {
                best = i;
            }
        }
        self.moves.swap(index, best);
        self.scores.swap(index, best);
        self.moves[index]
    }
}

impl Default for MoveList {
    fn default() -> Self {
        MoveList::new()
    }
}

impl Index<usize> for MoveList {
    type Output = Move;

    fn index(&self, index: usize) -> &Move {
        &self.as_slice()[index]
    }
}

impl fmt::Debug for MoveList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl fmt::Display for MoveList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for mv in self.iter() {
            write!(f, "{}{}", sep, mv)?;
            sep = " ";
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// One move list per ply, so that a recursive search or perft never allocates while running.
#[derive(Debug, Clone)]
pub struct MoveStack(Vec<MoveList>);

impl MoveStack {
    /// Creates a stack with room for `MAX_PLY` plies
    pub fn new() -> MoveStack {
        MoveStack(vec![MoveList::new(); MAX_PLY + 1])
    }

    /// Returns the number of plies the stack can hold
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl Default for MoveStack {
    fn default() -> Self {
        MoveStack::new()
    }
}

impl Index<usize> for MoveStack {
    type Output = MoveList;

    fn index(&self, ply: usize) -> &MoveList {
        &self.0[ply]
    }
}

impl IndexMut<usize> for MoveStack {
    fn index_mut(&mut self, ply: usize) -> &mut MoveList {
        &mut self.0[ply]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding() {
        let mv = Move::new(Square::E2, Square::E4);
        assert_eq!(mv.from(), Square::E2);
        assert_eq!(mv.to(), Square::E4);
        assert_eq!(mv.promotion(), None);
        assert!(!mv.is_castling());
        assert_eq!(mv.to_string(), "e2e4");

        let mv = Move::new_promotion(Square::B7, Square::A8, Piece::Knight);
        assert_eq!(mv.promotion(), Some(Piece::Knight));
        assert!(mv.is_promotion());
        assert_eq!(mv.to_string(), "b7a8n");

        let mv = Move::new_castling(Square::E8, Square::C8);
        assert!(mv.is_castling());
        assert_eq!(mv.to_string(), "e8c8");

        assert_eq!(std::mem::size_of::<Option<Move>>(), 2);
    }

    #[test]
    fn raw_round_trip() {
        let mv = Move::new_promotion(Square::G2, Square::G1, Piece::Queen);
        assert_eq!(Move::from_raw(mv.bits()), Some(mv));
        assert_eq!(Move::from_raw(0), None);
        assert_eq!(Move::from_raw(0x7 << 12 | 0o1234), None);
    }

    #[test]
    fn picker_visits_best_first() {
        let mut list = MoveList::new();
        let moves = [
            Move::new(Square::A2, Square::A3),
            Move::new(Square::B2, Square::B3),
            Move::new(Square::C2, Square::C3),
        ];
        for (i, &mv) in moves.iter().enumerate() {
            list.push(mv);
            list.set_score(i, [5, 50, -3][i]);
        }
        assert_eq!(list.pick(0), moves[1]);
        assert_eq!(list.pick(1), moves[0]);
        assert_eq!(list.pick(2), moves[2]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn retain_and_display() {
        let mut list = MoveList::new();
        list.push(Move::new(Square::G1, Square::F3));
        list.push(Move::new(Square::E2, Square::E4));
        list.push(Move::new(Square::D2, Square::D4));
        list.retain(|mv| mv.from() != Square::E2);
        assert_eq!(list.to_string(), "g1f3 d2d4");
        assert!(list.contains(Move::new(Square::D2, Square::D4)));
        assert!(!list.contains(Move::new(Square::E2, Square::E4)));
        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn stack_has_a_list_per_ply() {
        let mut stack = MoveStack::new();
        assert_eq!(stack.depth(), MAX_PLY + 1);
        stack[3].push(Move::new(Square::A1, Square::A2));
        assert_eq!(stack[3].len(), 1);
        assert!(stack[2].is_empty());
    }
}
