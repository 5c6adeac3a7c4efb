//! Move ordering heuristics
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use crate::chess::{Color, Move, MoveList, Piece, Position, Square, MAX_PLY};

// indexed by victim, then attacker: the most valuable victim first, then the least valuable
// attacker
const CAPTURE_BONUS: [[i32; Piece::COUNT]; Piece::COUNT] = [
    [ 6,  5,  4,  3,  2,  1],
    [12, 11, 10,  9,  8,  7],
    [18, 17, 16, 15, 14, 13],
    [24, 23, 22, 21, 20, 19],
    [30, 29, 28, 27, 26, 25],
    [ 0,  0,  0,  0,  0,  0],
];

const PROMOTION_BONUS: [i32; Piece::COUNT] = [0, 1, 2, 3, 4, 0];

const HASH_MOVE: i32 = 1_000_000;
const CAPTURE: i32 = 30_000;
const PROMOTION: i32 = 29_000;
const KILLERS: [i32; 2] = [28_000, 27_000];
// history scores stay below the killers
const HISTORY_MAX: i32 = 20_000;

type History = [[[i32; Square::COUNT]; Square::COUNT]; Color::COUNT];

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Killer moves and history scores gathered during a search, used to order moves
#[derive(Debug, Clone)]
pub struct MoveOrderer {
    killers: Vec<[Option<Move>; 2]>,
    history: Box<History>,
}

impl MoveOrderer {
    /// Creates an orderer with no killers and no history
    pub fn new() -> MoveOrderer {
        MoveOrderer {
            killers: vec![[None; 2]; MAX_PLY + 1],
            history: Box::new([[[0; Square::COUNT]; Square::COUNT]; Color::COUNT]),
        }
    }

    /// Forgets all killers and history
    pub fn clear(&mut self) {
        for killers in self.killers.iter_mut() {
            *killers = [None; 2];
        }
        *self.history = [[[0; Square::COUNT]; Square::COUNT]; Color::COUNT];
    }

    /// Returns the two killer moves for `ply`, most recent first
    pub fn killers(&self, ply: usize) -> [Option<Move>; 2] {
        self.killers[ply]
    }

    /// Returns the history score of `mv` played by `color`
    pub fn history(&self, color: Color, mv: Move) -> i32 {
        self.history[color as usize][mv.from() as usize][mv.to() as usize]
    }

    /// Records a quiet move which caused a beta cutoff at `ply` with `depth` plies remaining
    pub fn update(&mut self, color: Color, mv: Move, ply: usize, depth: usize) {
        let killers = &mut self.killers[ply];
        if killers[0] != Some(mv) {
            killers[1] = killers[0];
            killers[0] = Some(mv);
        }

        let depth = depth.min(100) as i32;
        let entry = &mut self.history[color as usize][mv.from() as usize][mv.to() as usize];
        *entry += depth * depth;

        if *entry > HISTORY_MAX {
            for table in self.history.iter_mut() {
                for row in table.iter_mut() {
                    for score in row.iter_mut() {
                        *score /= 2;
                    }
                }
            }
        }
    }

    /// Scores every move in `list` for the move picker: the hash move, then captures (most
    /// valuable victim, least valuable attacker), then promotions, then killers, and then
    /// history.
    pub fn score_moves(&self, pos: &Position, list: &mut MoveList, hash_move: Option<Move>,
        ply: usize)
    {
        let killers = self.killers[ply];
        let turn = pos.turn();

        for i in 0..list.len() {
            let mv = list[i];
            let score = if Some(mv) == hash_move {
                HASH_MOVE
            } else if let Some(bonus) = tactical_score(pos, mv) {
                bonus
            } else if Some(mv) == killers[0] {
                KILLERS[0]
            } else if Some(mv) == killers[1] {
                KILLERS[1]
            } else {
                1 + self.history(turn, mv)
            };
            list.set_score(i, score);
        }
    }

    /// Scores moves for the quiescence search, where only captures and promotions matter
    pub fn score_tactical(&self, pos: &Position, list: &mut MoveList) {
        for i in 0..list.len() {
            let score = tactical_score(pos, list[i]).unwrap_or(0);
            list.set_score(i, score);
        }
    }
}

impl Default for MoveOrderer {
    fn default() -> Self {
        MoveOrderer::new()
    }
}

/// Returns the piece `mv` captures, if any
pub fn captured_piece(pos: &Position, mv: Move) -> Option<Piece> {
    match pos.piece_at(mv.to()) {
        Some((color, piece)) if color != pos.turn() => Some(piece),
        Some(_) => None,
        None => match pos.piece_at(mv.from()) {
            Some((_, Piece::Pawn)) if pos.ep_square() == Some(mv.to()) => Some(Piece::Pawn),
            _ => None,
        },
    }
}

/// Returns `true` for moves that neither capture nor promote
pub fn is_quiet(pos: &Position, mv: Move) -> bool {
    !mv.is_promotion() && captured_piece(pos, mv).is_none()
}

fn tactical_score(pos: &Position, mv: Move) -> Option<i32> {
    if let Some(victim) = captured_piece(pos, mv) {
        let attacker = pos.piece_at(mv.from()).map_or(Piece::Pawn, |(_, p)| p);
        Some(CAPTURE + CAPTURE_BONUS[victim as usize][attacker as usize])
    } else {
        mv.promotion().map(|p| PROMOTION + PROMOTION_BONUS[p as usize])
    }
}
