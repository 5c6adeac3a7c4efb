//! Position evaluation
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::fmt;
use std::ops;
use std::sync::Arc;
use crate::chess::{Color, Piece, Position, Square, MAX_PLY};
use crate::chess::bitboard::{Bitboard, Direction, between, king_attacks, piece_attacks};
use super::weights::{Phase, PhaseWeights, Weights};
use super::pawns::PawnTable;
use super::endgame;

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Score
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Score(i16);

impl Score {
    /// Returns the greatest possible score
    pub fn infinity() -> Self {
        Score(10_000)
    }
    /// Returns the score for a draw
    pub fn draw() -> Self {
        Score(0)
    }
    /// Returns a score for a position that is won, but where no mate has been found
    pub fn known_win() -> Self {
        Score(7_000)
    }
    /// Returns the score for checkmating in `n` plies
    pub fn mates_in(n: usize) -> Self {
        Score::infinity() - n as i16
    }
    /// Returns the score for being checkmated in `n` plies
    pub fn mated_in(n: usize) -> Self {
        -Score::infinity() + n as i16
    }
    /// Returns `true` if the score is a forced mate for either side
    pub fn is_mate(self) -> bool {
        self >= Score::mates_in(MAX_PLY) || self <= Score::mated_in(MAX_PLY)
    }
    /// Returns the number of plies until mate, negative if the side to move is getting mated
    pub fn mate_plies(self) -> Option<i16> {
        if self >= Score::mates_in(MAX_PLY) {
            Some(Score::infinity().0 - self.0)
        } else if self <= Score::mated_in(MAX_PLY) {
            Some(-(Score::infinity().0 + self.0))
        } else {
            None
        }
    }
}

impl ops::Neg for Score {
    type Output = Score;

    fn neg(self) -> Self {
        Score(-self.0)
    }
}

impl ops::Add<i16> for Score {
    type Output = Score;

    fn add(self, rhs: i16) -> Self {
        Score(self.0 + rhs)
    }
}

impl ops::Sub<i16> for Score {
    type Output = Score;

    fn sub(self, rhs: i16) -> Self {
        Score(self.0 - rhs)
    }
}

impl From<i16> for Score {
    fn from(val: i16) -> Self {
        Score(val)
    }
}

impl From<Score> for i16 {
    fn from(val: Score) -> Self {
        val.0
    }
}

impl fmt::Display for Score {
    /// Formats the score the way UCI expects it: `cp <centipawns>` or `mate <moves>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mate_plies() {
            Some(plies) if plies >= 0 => write!(f, "mate {}", (plies + 1) / 2),
            Some(plies) => write!(f, "mate -{}", (-plies + 1) / 2),
            None => write!(f, "cp {}", self.0),
        }
    }
}

const PIECE_VAL: [i16; Piece::COUNT] = [ 100, 320, 330, 500, 900, 0 ];

/// Returns the value of a piece, used for move ordering and pruning
pub fn piece_val(piece: Piece) -> i16 {
    PIECE_VAL[piece as usize]
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// A static evaluator, holding the weights it evaluates with and a cache of pawn structure scores
#[derive(Debug)]
pub struct Evaluator {
    weights: Arc<Weights>,
    pawns: PawnTable,
}

impl Evaluator {
    /// Creates an evaluator using `weights`
    pub fn new(weights: Arc<Weights>) -> Evaluator {
        Evaluator {
            weights,
            pawns: PawnTable::new(),
        }
    }

    /// Returns the weights in use
    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Replaces the weights, discarding cached pawn scores
    pub fn set_weights(&mut self, weights: Arc<Weights>) {
        self.weights = weights;
        self.pawns.clear();
    }

    /// Discards cached pawn scores
    pub fn clear(&mut self) {
        self.pawns.clear();
    }

    /// Returns the estimated static score of `pos`, from the point of view of the side to move.
    pub fn evaluate(&mut self, pos: &Position) -> Score {
        if let Some(score) = endgame::evaluate(pos) {
            return score;
        }

        let weights = &*self.weights;
        let pawns = self.pawns.entry(pos, weights);
        let attacked = [attack_map(pos, Color::White), attack_map(pos, Color::Black)];

        let white = score_side(pos, Color::White, weights, &attacked);
        let black = score_side(pos, Color::Black, weights, &attacked);
        let mg = white[Phase::Middlegame as usize] - black[Phase::Middlegame as usize]
            + pawns.score(Phase::Middlegame);
        let eg = white[Phase::Endgame as usize] - black[Phase::Endgame as usize]
            + pawns.score(Phase::Endgame);

        let max_phase = weights.max_phase().max(1);
        let phase = game_phase(pos, weights).min(max_phase);
        let value = (mg * phase + eg * (max_phase - phase)) / max_phase;
        let value = if pos.turn() == Color::White { value } else { -value };

        let limit = i32::from(i16::from(Score::known_win())) - 1;
        Score(value.max(-limit).min(limit) as i16)
    }
}

/// Phase weight of the material on the board
fn game_phase(pos: &Position, weights: &Weights) -> i32 {
    let mut phase = 0;
    for &color in Color::ALL.iter() {
        for &piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen].iter() {
            phase += pos.piece_count(color, piece) as i32 * weights.phase_weight(piece);
        }
    }
    phase
}

/// Every square attacked by a piece of color `c`
fn attack_map(pos: &Position, c: Color) -> Bitboard {
    let occ = pos.occupied();
    let mut attacks = pos.pawn_attacks(c) | king_attacks(pos.king_square(c));
    for &piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen].iter() {
        for sq in pos.pieces(c, piece) {
            attacks |= piece_attacks(piece, c, sq, occ);
        }
    }
    attacks
}

/// Adds `n` times the term selected by `term` to the score of each phase
fn add<F>(score: &mut [i32; Phase::COUNT], weights: &Weights, n: i32, term: F)
where F: Fn(&PhaseWeights) -> i16 {
    for &phase in Phase::ALL.iter() {
        score[phase as usize] += n * i32::from(term(weights.phase(phase)));
    }
}

/// Scores everything but pawn structure for one side, returning a score per phase
fn score_side(pos: &Position, us: Color, weights: &Weights, attacked: &[Bitboard; Color::COUNT])
-> [i32; Phase::COUNT] {
    use Piece::*;

    let them = !us;
    let occ = pos.occupied();
    let own = pos.occupied_by(us);
    let all_pawns = pos.pieces_of_kind(Pawn);
    let our_pawns = pos.pieces(us, Pawn);
    let our_pawn_attacks = pos.pawn_attacks(us);
    let their_pawn_attacks = pos.pawn_attacks(them);
    // squares a piece can go without being lost to a pawn or to an undefended exchange
    let safe = !own & !their_pawn_attacks & !(attacked[them as usize] & !our_pawn_attacks);

    let mut score = [0; Phase::COUNT];

    for &piece in [Pawn, Knight, Bishop, Rook, Queen].iter() {
        let k = piece as usize;
        for sq in pos.pieces(us, piece) {
            let rel = sq.relative_to(us) as usize;
            add(&mut score, weights, 1, |w| w.piece_values[k]);
            add(&mut score, weights, 1, |w| w.piece_squares[k][rel]);

            if piece != Pawn {
                let mobility = (piece_attacks(piece, us, sq, occ) & safe).len() as i32;
                add(&mut score, weights, mobility, |w| w.mobility[k]);
            }

            if piece == Rook {
                let file = Bitboard::from(sq.file());
                if file.is_disjoint(all_pawns) {
                    add(&mut score, weights, 1, |w| w.rook_open_file);
                } else if file.is_disjoint(our_pawns) {
                    add(&mut score, weights, 1, |w| w.rook_semiopen_file);
                }
            }

            if (piece == Knight || piece == Bishop) && is_outpost(pos, us, sq) {
                if piece == Knight {
                    add(&mut score, weights, 1, |w| w.knight_outpost);
                } else {
                    add(&mut score, weights, 1, |w| w.bishop_outpost);
                }
            }
        }
    }

    let pushes = (our_pawns.forward(us) & !occ).len() as i32;
    add(&mut score, weights, pushes, |w| w.mobility[Pawn as usize]);

    let king = pos.king_square(us);
    let rel = king.relative_to(us) as usize;
    add(&mut score, weights, 1, |w| w.piece_squares[King as usize][rel]);
    let king_moves = (king_attacks(king) & !own & !attacked[them as usize]).len() as i32;
    add(&mut score, weights, king_moves, |w| w.mobility[King as usize]);

    let king_bb = Bitboard::from(king);
    let mut shield = (king_bb | king_bb.shift(Direction::East) | king_bb.shift(Direction::West))
        .forward(us);
    shield |= shield.forward(us);
    add(&mut score, weights, (shield & our_pawns).len() as i32, |w| w.king_shield);

    if let (Some(a), Some(b)) = (pos.piece_square(us, Rook, 0), pos.piece_square(us, Rook, 1)) {
        if pos.piece_count(us, Rook) == 2
            && (a.file() == b.file() || a.rank() == b.rank())
            && between(a, b).is_disjoint(occ) {
            add(&mut score, weights, 1, |w| w.connected_rooks);
        }
    }

    let bishops = pos.pieces(us, Bishop);
    if bishops.intersects(Bitboard::LIGHT_SQUARES) && bishops.intersects(Bitboard::DARK_SQUARES) {
        add(&mut score, weights, 1, |w| w.bishop_pair);
    }

    score
}

/// A square on the opponent's side of the board, defended by a pawn, that enemy pawns can never
/// attack
fn is_outpost(pos: &Position, us: Color, sq: Square) -> bool {
    let rank = us.relative_rank(sq.rank()) as usize;
    if rank < 3 || rank > 5 || !pos.pawn_attacks(us).contains(sq) {
        return false;
    }

    let front = Bitboard::from(sq).front_span(us);
    let span = front.shift(Direction::East) | front.shift(Direction::West);
    span.is_disjoint(pos.pieces(!us, Piece::Pawn))
}
