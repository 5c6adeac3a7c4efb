//! Contains a builder for `Position`
//
//  Copyright 2019 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use super::*;

////////////////////////////////////////////////////////////////////////////////////////////////////
/// A builder for `Position`
///
/// ```rust
/// use scarecrow::chess::{Color, Piece, PositionBuilder, Square};
///
/// let pos = PositionBuilder::new()
///     .piece(Color::White, Piece::King, Square::E1)
///     .piece(Color::White, Piece::Pawn, Square::E2)
///     .piece(Color::Black, Piece::King, Square::E8)
///     .validate()
///     .expect("legal position");
/// assert_eq!(pos.to_fen_str(), "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");
/// ```
#[derive(Debug, Clone)]
pub struct PositionBuilder {
    board: [Option<(Color, Piece)>; Square::COUNT],
    turn: Color,
    castling: CastlingRights,
    ep_square: Option<Square>,
    halfmove_clock: u16,
    fullmove_number: u16,
}

impl PositionBuilder {
    /// Creates a new, empty `PositionBuilder`
    pub fn new() -> Self {
        PositionBuilder {
            board: [None; Square::COUNT],
            turn: White,
            castling: CastlingRights::NONE,
            ep_square: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Sets the piece at `square`
    pub fn piece(&mut self, color: Color, piece: Piece, square: Square) -> &mut Self {
        self.board[square as usize] = Some((color, piece));
        self
    }

    /// Clears the piece at `square`
    pub fn clear(&mut self, square: Square) -> &mut Self {
        self.board[square as usize] = None;
        self
    }

    /// Sets the turn to `color`
    pub fn turn(&mut self, color: Color) -> &mut Self {
        self.turn = color;
        self
    }

    /// Sets the castling rights for both sides
    pub fn castling(&mut self, rights: CastlingRights) -> &mut Self {
        self.castling = rights;
        self
    }

    /// Sets or clears the en-passant square
    pub fn en_passant_square(&mut self, square: Option<Square>) -> &mut Self {
        self.ep_square = square;
        self
    }

    /// Sets the number of plies that count toward the 50-move rule. A ply is a move by one player,
    /// so two plies would be one move by each player.
    pub fn halfmove_clock(&mut self, plies: u16) -> &mut Self {
        self.halfmove_clock = plies;
        self
    }

    /// Sets the move number
    pub fn fullmove_number(&mut self, number: u16) -> &mut Self {
        self.fullmove_number = number;
        self
    }

    /// Validates legality and returns a `Position`
    pub fn validate(&self) -> Result<Position> {
        use Error::*;

        let mut pos = Position::empty_board();

        for sq in Square::all() {
            if let Some((color, piece)) = self.board[sq as usize] {
                if pos.piece_count(color, piece) >= MAX_PIECES {
                    return Err(TooManyPieces);
                }
                pos.put_piece(color, piece, sq);
            }
        }

        pos.turn = self.turn;
        pos.castling = self.castling;
        pos.ep_square = self.ep_square;
        pos.halfmove_clock = self.halfmove_clock;
        pos.fullmove_number = self.fullmove_number;

        // Step 1: verify exactly one king per side
        // Step 2: no pawns on ranks 1 and 8
        for &c in Color::ALL.iter() {
            if pos.piece_count(c, King) != 1 {
                return Err(InvalidKingCount);
            }
            if pos.pieces(c, Pawn).intersects(Bitboard::from(Rank::R1) | Rank::R8.into()) {
                return Err(InvalidPawnRank);
            }
        }
        // Step 3: opponent's king is not attacked
        if pos.is_square_attacked(pos.king_square(!pos.turn), pos.turn) {
            return Err(KingCapturable);
        }
        // Step 4: if there is an EP square, it must be empty, on the right rank, and there must
        // be a pawn to capture in front of it
        if let Some(ep_square) = pos.ep_square {
            if pos.piece_at(ep_square).is_some() {
                return Err(EnPassantSquareOccupied);
            }
            let them = !pos.turn;
            let pawn_sq = ep_square.offset(0, them.forward());
            if them.relative_rank(ep_square.rank()) != Rank::R3
                || pawn_sq.map(|sq| pos.piece_at(sq)) != Some(Some((them, Pawn))) {
                return Err(MissingEnPassantPawn);
            }
        }
        // Step 5: if castling rights exist, king and rook must be in the correct squares
        for &c in Color::ALL.iter() {
            let king_home = Square::E1.relative_to(c);
            let king_side = CastlingRights::king_side(c);
            let queen_side = CastlingRights::queen_side(c);

            if (pos.castling.contains(king_side) || pos.castling.contains(queen_side))
                && pos.piece_at(king_home) != Some((c, King)) {
                return Err(InvalidCastlingFlags);
            }
            if pos.castling.contains(king_side)
                && pos.piece_at(Square::H1.relative_to(c)) != Some((c, Rook)) {
                return Err(InvalidCastlingFlags);
            }
            if pos.castling.contains(queen_side)
                && pos.piece_at(Square::A1.relative_to(c)) != Some((c, Rook)) {
                return Err(InvalidCastlingFlags);
            }
        }

        let (hash, pawn_hash) = pos.calc_zobrist();
        pos.hash = hash;
        pos.pawn_hash = pawn_hash;

        Ok(pos)
    }
}

impl Default for PositionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_valid_position() {
        let pos = PositionBuilder::new()
            .piece(White, King, Square::E1)
            .piece(White, Rook, Square::H1)
            .piece(Black, King, Square::E8)
            .castling(CastlingRights::WHITE_KING_SIDE)
            .turn(Black)
            .fullmove_number(12)
            .validate()
            .expect("valid");
        assert_eq!(pos.to_fen_str(), "4k3/8/8/8/8/8/8/4K2R b K - 0 12");
    }

    #[test]
    fn cleared_square_is_empty() {
        let result = PositionBuilder::new()
            .piece(White, King, Square::E1)
            .piece(Black, King, Square::E8)
            .piece(Black, Queen, Square::E2)
            .clear(Square::E2)
            .validate();
        assert!(result.is_ok());
    }

    #[test]
    fn too_many_pieces_is_an_error() {
        let mut builder = PositionBuilder::new();
        builder.piece(White, King, Square::A1).piece(Black, King, Square::H8);
        for sq in [Square::C3, Square::C4, Square::C5, Square::C6, Square::D3, Square::D4,
                   Square::D5, Square::D6, Square::E3, Square::E4, Square::E5].iter() {
            builder.piece(White, Knight, *sq);
        }
        assert_eq!(builder.validate(), Err(Error::TooManyPieces));
    }

    #[test]
    fn en_passant_square_on_wrong_rank_is_an_error() {
        let result = PositionBuilder::new()
            .piece(White, King, Square::E1)
            .piece(Black, King, Square::E8)
            .piece(Black, Pawn, Square::D4)
            .en_passant_square(Some(Square::D3))
            .validate();
        assert_eq!(result, Err(Error::MissingEnPassantPawn));
    }
}
