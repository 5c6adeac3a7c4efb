//! Contains structures related to the `Position`
//
//  Copyright 2019 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::convert::TryFrom;
use std::str::FromStr;
use std::fmt;
use super::*;

use bitboard::*;

use Color::*;
use Piece::*;

pub mod zobrist;
mod builder;
mod movegen;

pub use builder::PositionBuilder;
pub use movegen::Pin;
use zobrist::Zobrist;

/// The FEN of the standard starting position
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// The most pieces of a single kind and color a position may hold
const MAX_PIECES: usize = 10;

////////////////////////////////////////////////////////////////////////////////////////////////////
/// The set of castling moves still available to each side
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    /// No castling for either side
    pub const NONE: CastlingRights = CastlingRights(0);
    /// White may castle king side
    pub const WHITE_KING_SIDE: CastlingRights = CastlingRights(1);
    /// White may castle queen side
    pub const WHITE_QUEEN_SIDE: CastlingRights = CastlingRights(2);
    /// Black may castle king side
    pub const BLACK_KING_SIDE: CastlingRights = CastlingRights(4);
    /// Black may castle queen side
    pub const BLACK_QUEEN_SIDE: CastlingRights = CastlingRights(8);
    /// Every castling move is available
    pub const ALL: CastlingRights = CastlingRights(15);
    /// The number of distinct sets of castling rights
    pub const COMBINATIONS: usize = 16;

    /// King-side castling for `color`
    pub fn king_side(color: Color) -> CastlingRights {
        match color {
            White => CastlingRights::WHITE_KING_SIDE,
            Black => CastlingRights::BLACK_KING_SIDE,
        }
    }

    /// Queen-side castling for `color`
    pub fn queen_side(color: Color) -> CastlingRights {
        match color {
            White => CastlingRights::WHITE_QUEEN_SIDE,
            Black => CastlingRights::BLACK_QUEEN_SIDE,
        }
    }

    /// Returns the raw four-bit value
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if every right in `other` is also in `self`
    pub fn contains(self, other: CastlingRights) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no castling is available
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Adds the rights in `other`
    pub fn insert(&mut self, other: CastlingRights) {
        self.0 |= other.0;
    }

    /// Removes the rights in `other`
    pub fn remove(&mut self, other: CastlingRights) {
        self.0 &= !other.0;
    }

    /// Returns the rights with white and black exchanged
    pub fn flipped(self) -> CastlingRights {
        CastlingRights((self.0 >> 2) | (self.0 & 3) << 2)
    }

    // rights that survive a piece moving from or to `sq`
    fn mask(sq: Square) -> u8 {
        match sq {
            Square::A1 => !2,
            Square::E1 => !3,
            Square::H1 => !1,
            Square::A8 => !8,
            Square::E8 => !12,
            Square::H8 => !4,
            _ => !0,
        }
    }
}

impl fmt::Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return "-".fmt(f);
        }
        let mut s = String::new();
        for (right, c) in [
            (CastlingRights::WHITE_KING_SIDE, 'K'), (CastlingRights::WHITE_QUEEN_SIDE, 'Q'),
            (CastlingRights::BLACK_KING_SIDE, 'k'), (CastlingRights::BLACK_QUEEN_SIDE, 'q'),
        ].iter() {
            if self.contains(*right) {
                s.push(*c);
            }
        }
        s.fmt(f)
    }
}

impl FromStr for CastlingRights {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "-" {
            return Ok(CastlingRights::NONE);
        }
        if s.is_empty() {
            return Err(Error::ParseError);
        }

        let mut rights = CastlingRights::NONE;
        for c in s.chars() {
            match c {
                'K' => rights.insert(CastlingRights::WHITE_KING_SIDE),
                'Q' => rights.insert(CastlingRights::WHITE_QUEEN_SIDE),
                'k' => rights.insert(CastlingRights::BLACK_KING_SIDE),
                'q' => rights.insert(CastlingRights::BLACK_QUEEN_SIDE),
                _ => return Err(Error::ParseError),
            }
        }
        Ok(rights)
    }
}

/// Returns the rook's origin and destination for the castling move whose king lands on `to`
fn castling_rook_squares(to: Square) -> (Square, Square) {
    match to {
        Square::G1 => (Square::H1, Square::F1),
        Square::C1 => (Square::A1, Square::D1),
        Square::G8 => (Square::H8, Square::F8),
        _ => (Square::A8, Square::D8),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// A representation of the arrangement of pieces on the board at a given point in the game, as well
/// as castling availability and en passant legality.
///
/// The position is changed in place by [`do_move`](#method.do_move), and restored by passing the
/// returned [`MoveInfo`](struct.MoveInfo.html) to [`undo_move`](#method.undo_move). Pairs of
/// `do_move` and `undo_move` calls must be nested, last in first out.
#[derive(Clone)]
pub struct Position {
    board: [Option<(Color, Piece)>; Square::COUNT],
    by_color: [Bitboard; Color::COUNT],
    by_piece: [Bitboard; Piece::COUNT],

    piece_list: [[[Square; MAX_PIECES]; Piece::COUNT]; Color::COUNT],
    piece_count: [[u8; Piece::COUNT]; Color::COUNT],
    list_index: [u8; Square::COUNT],

    turn: Color,
    castling: CastlingRights,
    ep_square: Option<Square>,
    halfmove_clock: u16,
    fullmove_number: u16,

    hash: Zobrist,
    pawn_hash: Zobrist,
    history: Vec<Zobrist>,
}

impl Position {
    /// Returns the standard starting Position
    pub fn new() -> Position {
        Position::from_fen_str(START_FEN).expect("INFALLIBLE")
    }

    /// Returns a position with an empty board
    fn empty_board() -> Position {
        Position {
            board: [None; Square::COUNT],
            by_color: [Bitboard::new(); Color::COUNT],
            by_piece: [Bitboard::new(); Piece::COUNT],
            piece_list: [[[Square::A1; MAX_PIECES]; Piece::COUNT]; Color::COUNT],
            piece_count: [[0; Piece::COUNT]; Color::COUNT],
            list_index: [0; Square::COUNT],
            turn: White,
            castling: CastlingRights::NONE,
            ep_square: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            hash: Zobrist::new(),
            pawn_hash: Zobrist::new(),
            history: Vec::with_capacity(MAX_PLY * 2),
        }
    }

    /// Parse a position from a FEN string. The halfmove clock and fullmove number may be
    /// omitted, in which case they default to 0 and 1.
    pub fn from_fen_str(s: &str) -> Result<Position> {
        let mut builder = PositionBuilder::new();
        let mut fields = s.split_whitespace();

        // parse the board
        let board = fields.next().ok_or(Error::ParseError)?;
        let mut r = Rank::COUNT - 1;
        let mut f = 0;
        for c in board.chars() {
            match c {
                '1' ..= '8' => {
                    f += c.to_digit(10).expect("INFALLIBLE") as usize;
                    if f > File::COUNT {
                        return Err(Error::ParseError);
                    }
                },
                '/' => {
                    if f == File::COUNT && r > 0 {
                        r -= 1;
                        f = 0;
                    } else {
                        return Err(Error::ParseError);
                    }
                },
                _ => {
                    if f >= File::COUNT {
                        return Err(Error::ParseError);
                    }
                    let (color, piece) = Piece::from_char(c)?;
                    builder.piece(color, piece, Square::from_coord(
                        File::try_from(f)?, Rank::try_from(r)?));
                    f += 1;
                },
            }
        }
        if r > 0 || f < File::COUNT {
            return Err(Error::ParseError);
        }

        // parse the turn
        builder.turn(fields.next().ok_or(Error::ParseError)?.parse()?);

        // parse the castling flags
        builder.castling(fields.next().ok_or(Error::ParseError)?.parse()?);

        // parse en passant square
        match fields.next() {
            Some("-") => {},
            Some(ep_square) => { builder.en_passant_square(Some(ep_square.parse()?)); },
            None => return Err(Error::ParseError),
        }

        // parse half move clock, if present
        if let Some(plies) = fields.next() {
            builder.halfmove_clock(plies.parse()?);
        }

        // parse move number, if present
        if let Some(move_num) = fields.next() {
            builder.fullmove_number(move_num.parse()?);
        }

        if fields.next().is_some() {
            return Err(Error::ParseError);
        }

        builder.validate()
    }

    /// Converts the position to a FEN string
    pub fn to_fen_str(&self) -> String {
        let mut board = String::new();

        for r in (0..Rank::COUNT).rev() {
            let mut count = 0;
            for f in 0..File::COUNT {
                let sq = Square::from_coord(
                    File::try_from(f).expect("INFALLIBLE"), Rank::try_from(r).expect("INFALLIBLE"));
                if let Some((c, p)) = self.board[sq as usize] {
                    if count > 0 {
                        board += &count.to_string();
                        count = 0;
                    }
                    board.push(p.to_char(c));
                } else {
                    count += 1;
                }
            }
            if count > 0 {
                board += &count.to_string();
            }
            if r > 0 {
                board += "/";
            }
        }

        let ep_square = match self.ep_square {
            Some(sq) => sq.to_string(),
            None => "-".to_string(),
        };

        format!("{} {} {} {} {} {}", board, self.turn, self.castling, ep_square,
                                     self.halfmove_clock, self.fullmove_number)
    }

    /// Returns the color whose turn it is
    pub fn turn(&self) -> Color {
        self.turn
    }

    /// Returns the castling rights
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    /// Returns the square a pawn may capture en passant on, if any
    pub fn ep_square(&self) -> Option<Square> {
        self.ep_square
    }

    /// Returns the number of plies since the last capture or pawn move
    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    /// Returns the move number, starting at 1 and incremented after black's move
    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    /// Return the position's Zobrist key
    pub fn zobrist_key(&self) -> Zobrist {
        self.hash
    }

    /// Returns a Zobrist key computed from the pawns alone
    pub fn pawn_key(&self) -> Zobrist {
        self.pawn_hash
    }

    /// Returns the color and type of piece, if any, at the given location
    pub fn piece_at(&self, sq: Square) -> Option<(Color, Piece)> {
        self.board[sq as usize]
    }

    /// Returns all occupied squares
    pub fn occupied(&self) -> Bitboard {
        self.by_color[White as usize] | self.by_color[Black as usize]
    }

    /// Returns the squares occupied by pieces of color `c`
    pub fn occupied_by(&self, c: Color) -> Bitboard {
        self.by_color[c as usize]
    }

    /// Returns the squares occupied by pieces of kind `p`, of either color
    pub fn pieces_of_kind(&self, p: Piece) -> Bitboard {
        self.by_piece[p as usize]
    }

    /// Returns the squares occupied by pieces of color `c` and kind `p`
    pub fn pieces(&self, c: Color, p: Piece) -> Bitboard {
        self.by_color[c as usize] & self.by_piece[p as usize]
    }

    /// Returns the number of pieces of color `c` and kind `p`
    pub fn piece_count(&self, c: Color, p: Piece) -> usize {
        self.piece_count[c as usize][p as usize] as usize
    }

    /// Returns the squares of the pieces of color `c` and kind `p`, in no particular order
    pub fn piece_squares(&self, c: Color, p: Piece) -> &[Square] {
        &self.piece_list[c as usize][p as usize][..self.piece_count(c, p)]
    }

    /// Returns the square of the `n`th piece of color `c` and kind `p`
    pub fn piece_square(&self, c: Color, p: Piece, n: usize) -> Option<Square> {
        self.piece_squares(c, p).get(n).copied()
    }

    /// Returns the square where the king of the given color is located
    pub fn king_square(&self, c: Color) -> Square {
        self.piece_list[c as usize][King as usize][0]
    }

    /// Returns `true` if color `c` has anything besides pawns and its king
    pub fn has_non_pawn_material(&self, c: Color) -> bool {
        !(self.by_color[c as usize] & !self.by_piece[Pawn as usize] & !self.by_piece[King as usize])
            .is_empty()
    }

    /// Returns all pieces of either color attacking `sq`, with sliding attacks computed as if
    /// the occupied squares were `occ`
    pub fn attackers_to(&self, sq: Square, occ: Bitboard) -> Bitboard {
        let bishops = self.by_piece[Bishop as usize] | self.by_piece[Queen as usize];
        let rooks = self.by_piece[Rook as usize] | self.by_piece[Queen as usize];

        (pawn_attacks(White, sq) & self.pieces(Black, Pawn))
            | (pawn_attacks(Black, sq) & self.pieces(White, Pawn))
            | (knight_attacks(sq) & self.by_piece[Knight as usize])
            | (king_attacks(sq) & self.by_piece[King as usize])
            | (bishop_attacks(sq, occ) & bishops)
            | (rook_attacks(sq, occ) & rooks)
    }

    /// Returns `true` if `sq` is attacked by a piece of color `c`, with sliding attacks
    /// computed as if the occupied squares were `occ`
    fn attacked_through(&self, sq: Square, c: Color, occ: Bitboard) -> bool {
        let them = self.by_color[c as usize];
        let bishops = (self.by_piece[Bishop as usize] | self.by_piece[Queen as usize]) & them;
        let rooks = (self.by_piece[Rook as usize] | self.by_piece[Queen as usize]) & them;

        pawn_attacks(!c, sq).intersects(self.pieces(c, Pawn))
            || knight_attacks(sq).intersects(self.pieces(c, Knight))
            || king_attacks(sq).intersects(self.pieces(c, King))
            || bishop_attacks(sq, occ).intersects(bishops)
            || rook_attacks(sq, occ).intersects(rooks)
    }

    /// Returns `true` if `sq` is attacked by a piece of color `c`
    pub fn is_square_attacked(&self, sq: Square, c: Color) -> bool {
        self.attacked_through(sq, c, self.occupied())
    }

    /// Returns a bitboard containing all squares attacked by pawns of color `c`
    pub fn pawn_attacks(&self, c: Color) -> Bitboard {
        let pushed = self.pieces(c, Pawn).forward(c);
        pushed.shift(Direction::East) | pushed.shift(Direction::West)
    }

    /// Returns the enemy pieces giving check to the side to move
    pub fn checkers(&self) -> Bitboard {
        self.attackers_to(self.king_square(self.turn), self.occupied())
            & self.by_color[!self.turn as usize]
    }

    /// Returns `true` if the color to move is in check
    pub fn in_check(&self) -> bool {
        self.attacked_through(self.king_square(self.turn), !self.turn, self.occupied())
    }

    /// Returns `true` if a draw by the fifty move rule can be claimed (assuming the game isn't
    /// already over)
    pub fn is_fifty_move_draw(&self) -> bool {
        self.halfmove_clock >= 100
    }

    /// Returns `true` if the current position occurred before, since the last capture or pawn
    /// move, with the same side to move
    pub fn is_repetition(&self) -> bool {
        let n = self.history.len();
        let limit = (self.halfmove_clock as usize).min(n);

        (4..=limit).step_by(2).any(|i| self.history[n - i] == self.hash)
    }

    /// Returns `true` if neither side can possibly checkmate: bare kings, a single minor piece,
    /// or only bishops that all stand on squares of one color
    pub fn has_insufficient_material(&self) -> bool {
        let heavy = self.by_piece[Pawn as usize] | self.by_piece[Rook as usize]
            | self.by_piece[Queen as usize];
        if !heavy.is_empty() {
            return false;
        }

        let knights = self.by_piece[Knight as usize];
        let bishops = self.by_piece[Bishop as usize];
        if (knights | bishops).len() <= 1 {
            return true;
        }

        knights.is_empty()
            && (bishops.is_disjoint(Bitboard::LIGHT_SQUARES)
                || bishops.is_disjoint(Bitboard::DARK_SQUARES))
    }

    /// Places a piece on an empty square
    fn put_piece(&mut self, c: Color, p: Piece, sq: Square) {
        debug_assert!(self.board[sq as usize].is_none());

        let count = &mut self.piece_count[c as usize][p as usize];
        self.piece_list[c as usize][p as usize][*count as usize] = sq;
        self.list_index[sq as usize] = *count;
        *count += 1;

        self.board[sq as usize] = Some((c, p));
        self.by_color[c as usize].insert(sq);
        self.by_piece[p as usize].insert(sq);
        self.hash.toggle_piece(c, p, sq);
        if p == Pawn {
            self.pawn_hash.toggle_piece(c, p, sq);
        }
    }

    /// Removes the piece on `sq`, which must be of color `c` and kind `p`
    fn remove_piece(&mut self, c: Color, p: Piece, sq: Square) {
        debug_assert_eq!(self.board[sq as usize], Some((c, p)));

        let list = &mut self.piece_list[c as usize][p as usize];
        let count = &mut self.piece_count[c as usize][p as usize];
        let index = self.list_index[sq as usize];
        *count -= 1;
        let last = list[*count as usize];
        list[index as usize] = last;
        self.list_index[last as usize] = index;

        self.board[sq as usize] = None;
        self.by_color[c as usize].remove(sq);
        self.by_piece[p as usize].remove(sq);
        self.hash.toggle_piece(c, p, sq);
        if p == Pawn {
            self.pawn_hash.toggle_piece(c, p, sq);
        }
    }

    /// Moves a piece of color `c` and kind `p` to an empty square
    fn move_piece(&mut self, c: Color, p: Piece, from: Square, to: Square) {
        debug_assert_eq!(self.board[from as usize], Some((c, p)));
        debug_assert!(self.board[to as usize].is_none());

        let index = self.list_index[from as usize];
        self.piece_list[c as usize][p as usize][index as usize] = to;
        self.list_index[to as usize] = index;

        self.board[from as usize] = None;
        self.board[to as usize] = Some((c, p));
        let change = Bitboard::from(from) | to.into();
        self.by_color[c as usize] ^= change;
        self.by_piece[p as usize] ^= change;
        self.hash.toggle_piece(c, p, from);
        self.hash.toggle_piece(c, p, to);
        if p == Pawn {
            self.pawn_hash.toggle_piece(c, p, from);
            self.pawn_hash.toggle_piece(c, p, to);
        }
    }

    fn set_castling_rights(&mut self, rights: CastlingRights) {
        if rights != self.castling {
            self.hash.toggle_castling_rights(self.castling);
            self.hash.toggle_castling_rights(rights);
            self.castling = rights;
        }
    }

    fn set_ep_square(&mut self, ep_square: Option<Square>) {
        if let Some(sq) = self.ep_square {
            self.hash.toggle_ep_square(sq);
        }
        if let Some(sq) = ep_square {
            self.hash.toggle_ep_square(sq);
        }
        self.ep_square = ep_square;
    }

    fn toggle_turn(&mut self) {
        self.turn = !self.turn;
        self.hash.toggle_turn();
    }

    /// Plays `mv`, which must be legal in this position, and returns the information needed to
    /// take it back with [`undo_move`](#method.undo_move).
    pub fn do_move(&mut self, mv: Move) -> MoveInfo {
        let us = self.turn;
        let them = !us;
        let from = mv.from();
        let to = mv.to();
        let (_, piece) = self.board[from as usize].expect("move from an empty square");
        debug_assert_eq!(self.board[from as usize].map(|(c, _)| c), Some(us));

        let mut info = MoveInfo {
            captured: None,
            castling: self.castling,
            ep_square: self.ep_square,
            en_passant: false,
            halfmove_clock: self.halfmove_clock,
        };

        self.history.push(self.hash);
        self.set_ep_square(None);
        self.halfmove_clock += 1;

        if mv.is_castling() {
            let (rook_from, rook_to) = castling_rook_squares(to);
            self.move_piece(us, King, from, to);
            self.move_piece(us, Rook, rook_from, rook_to);
        } else {
            if piece == Pawn && Some(to) == info.ep_square {
                self.remove_piece(them, Pawn, Square::from_coord(to.file(), from.rank()));
                info.captured = Some(Pawn);
                info.en_passant = true;
            } else if let Some((_, captured)) = self.board[to as usize] {
                self.remove_piece(them, captured, to);
                info.captured = Some(captured);
            }

            match mv.promotion() {
                Some(promoted) => {
                    self.remove_piece(us, Pawn, from);
                    self.put_piece(us, promoted, to);
                },
                None => self.move_piece(us, piece, from, to),
            }

            if piece == Pawn {
                self.halfmove_clock = 0;
                if from.distance(to) == 2 {
                    let skipped = Square::from_coord(from.file(), Rank::try_from(
                        (from.rank() as usize + to.rank() as usize) / 2).expect("INFALLIBLE"));
                    self.set_ep_square(Some(skipped));
                }
            } else if info.captured.is_some() {
                self.halfmove_clock = 0;
            }
        }

        let mask = CastlingRights::mask(from) & CastlingRights::mask(to);
        self.set_castling_rights(CastlingRights(self.castling.0 & mask));

        if us == Black {
            self.fullmove_number += 1;
        }
        self.toggle_turn();

        info
    }

    /// Takes back `mv`, which must be the last move played, using the `info` returned when it
    /// was played.
    pub fn undo_move(&mut self, mv: Move, info: MoveInfo) {
        self.toggle_turn();
        let us = self.turn;
        let them = !us;
        let from = mv.from();
        let to = mv.to();

        if us == Black {
            self.fullmove_number -= 1;
        }
        self.set_castling_rights(info.castling);
        self.set_ep_square(info.ep_square);
        self.halfmove_clock = info.halfmove_clock;

        if mv.is_castling() {
            let (rook_from, rook_to) = castling_rook_squares(to);
            self.move_piece(us, Rook, rook_to, rook_from);
            self.move_piece(us, King, to, from);
        } else {
            match mv.promotion() {
                Some(promoted) => {
                    self.remove_piece(us, promoted, to);
                    self.put_piece(us, Pawn, from);
                },
                None => {
                    let (_, piece) = self.board[to as usize].expect("move to an empty square");
                    self.move_piece(us, piece, to, from);
                },
            }

            if let Some(captured) = info.captured {
                let sq = if info.en_passant {
                    Square::from_coord(to.file(), from.rank())
                } else {
                    to
                };
                self.put_piece(them, captured, sq);
            }
        }

        let previous = self.history.pop();
        debug_assert_eq!(previous, Some(self.hash));
    }

    /// Passes the turn to the opponent without moving. Must not be called while in check.
    pub fn do_null_move(&mut self) -> MoveInfo {
        let info = MoveInfo {
            captured: None,
            castling: self.castling,
            ep_square: self.ep_square,
            en_passant: false,
            halfmove_clock: self.halfmove_clock,
        };

        self.history.push(self.hash);
        self.set_ep_square(None);
        self.halfmove_clock += 1;
        self.toggle_turn();

        info
    }

    /// Takes back a null move
    pub fn undo_null_move(&mut self, info: MoveInfo) {
        self.toggle_turn();
        self.set_ep_square(info.ep_square);
        self.halfmove_clock = info.halfmove_clock;
        self.history.pop();
    }

    /// Converts a move in coordinate notation (`e2e4`, `e7e8q`, `e1g1`) to a legal move in this
    /// position.
    pub fn parse_move(&self, s: &str) -> Result<Move> {
        let s = s.trim();
        if (s.len() != 4 && s.len() != 5) || !s.is_ascii() {
            return Err(Error::ParseError);
        }
        let from: Square = s[0..2].parse()?;
        let to: Square = s[2..4].parse()?;
        let promotion = match s.get(4..5) {
            Some(p) => Some(p.parse::<Piece>()?),
            None => None,
        };

        let mut list = MoveList::new();
        self.generate_legal(&mut list);
        list.iter()
            .copied()
            .find(|mv| mv.from() == from && mv.to() == to && mv.promotion() == promotion)
            .ok_or(Error::IllegalMove)
    }

    /// Calculates the position's Zobrist keys from scratch, returning the full key and the pawn
    /// key
    fn calc_zobrist(&self) -> (Zobrist, Zobrist) {
        let mut hash = Zobrist::new();
        let mut pawn_hash = Zobrist::new();

        if self.turn == Black {
            hash.toggle_turn();
        }
        if let Some(ep_square) = self.ep_square {
            hash.toggle_ep_square(ep_square);
        }
        hash.toggle_castling_rights(self.castling);

        for sq in Square::all() {
            if let Some((c, p)) = self.board[sq as usize] {
                hash.toggle_piece(c, p, sq);
                if p == Pawn {
                    pawn_hash.toggle_piece(c, p, sq);
                }
            }
        }

        (hash, pawn_hash)
    }

    /// Returns the same position with the board flipped vertically and the colors exchanged,
    /// so that white's pieces become black's and the other side is to move
    pub fn color_flipped(&self) -> Position {
        let mut builder = PositionBuilder::new();

        for sq in Square::all() {
            if let Some((c, p)) = self.board[sq as usize] {
                builder.piece(!c, p, sq.flip_rank());
            }
        }
        builder.turn(!self.turn)
            .castling(self.castling.flipped())
            .en_passant_square(self.ep_square.map(Square::flip_rank))
            .halfmove_clock(self.halfmove_clock)
            .fullmove_number(self.fullmove_number);

        builder.validate().expect("INFALLIBLE")
    }
}

impl Default for Position {
    /// Returns the standard starting Position
    fn default() -> Self {
        Position::new()
    }
}

impl PartialEq for Position {
    /// Compares everything but the game history. Piece lists are compared as sets.
    fn eq(&self, other: &Position) -> bool {
        let same_lists = Color::ALL.iter().all(|&c| {
            Piece::ALL.iter().all(|&p| {
                let mine: Bitboard = self.piece_squares(c, p).iter().copied().collect();
                let theirs: Bitboard = other.piece_squares(c, p).iter().copied().collect();
                self.piece_count(c, p) == other.piece_count(c, p) && mine == theirs
            })
        });

        same_lists
            && self.board[..] == other.board[..]
            && self.by_color == other.by_color
            && self.by_piece == other.by_piece
            && self.turn == other.turn
            && self.castling == other.castling
            && self.ep_square == other.ep_square
            && self.halfmove_clock == other.halfmove_clock
            && self.fullmove_number == other.fullmove_number
            && self.hash == other.hash
            && self.pawn_hash == other.pawn_hash
    }
}

impl Eq for Position { }

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position(\"{}\")", self.to_fen_str())
    }
}

impl fmt::Display for Position {
    /// Writes out the position using FEN
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_fen_str().fmt(f)
    }
}

impl FromStr for Position {
    type Err = Error;

    /// Parse a position from a FEN string
    fn from_str(s: &str) -> Result<Self> {
        Position::from_fen_str(s)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;
    use super::*;

    const KIWIPETE: &str =
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    fn pos(fen: &str) -> Position {
        Position::from_fen_str(fen).expect("valid fen")
    }

    /// Position::new() must return the standard starting position.
    #[test]
    fn new_returns_the_standard_starting_position() {
        assert_eq!(Position::new().to_fen_str(), START_FEN);
        assert_eq!(Position::new().piece_count(White, Pawn), 8);
        assert_eq!(Position::new().king_square(Black), Square::E8);
    }

    /// Tests for Position::from_fen_str()
    mod from_fen_str {
        use super::*;
        use Error::*;

        // 1. empty string returns error
        #[test]
        fn empty_string_returns_error() {
            assert_eq!(Position::from_fen_str(""), Err(ParseError));
            assert_eq!(Position::from_fen_str(" \t\r\n"), Err(ParseError));
        }

        // 2. 0 or 9 in board string returns error
        #[test]
        fn invalid_empty_square_count_returns_error() {
            assert_eq!(Position::from_fen_str("0K1k5/8/8/8/8/8/8/8 w - - 0 1"), Err(ParseError));
            assert_eq!(Position::from_fen_str("K1k5/9/8/8/8/8/8/8 w - - 0 1"), Err(ParseError));
        }

        // 3. A rank with more or fewer than 8 squares returns error
        #[test]
        fn bad_rank_length_returns_error() {
            assert_eq!(Position::from_fen_str("K1k6/8/8/8/8/8/8/8 w - - 0 1"), Err(ParseError));
            assert_eq!(Position::from_fen_str("K1k5b/8/8/8/8/8/8/8 w - - 0 1"), Err(ParseError));
            assert_eq!(Position::from_fen_str("K1k4/8/8/8/8/8/8/8 w - - 0 1"), Err(ParseError));
            assert_eq!(Position::from_fen_str("K1k5/8/8/8/8/8/8/b6 w - - 0 1"), Err(ParseError));
        }

        // 4. Too many or too few ranks returns error
        #[test]
        fn bad_rank_count_returns_error() {
            assert_eq!(Position::from_fen_str("K1k5/8/8/8/8/8/8/8/8 w - - 0 1"), Err(ParseError));
            assert_eq!(Position::from_fen_str("K1k5/8/8/8/8/8/8 w - - 0 1"), Err(ParseError));
        }

        // 5. Missing or invalid fields return error
        #[test]
        fn bad_fields_return_error() {
            assert_eq!(Position::from_fen_str("K1k5/8/8/8/8/8/8/8"), Err(ParseError));
            assert_eq!(Position::from_fen_str("K1k5/8/8/8/8/8/8/8 x - - 0 1"), Err(ParseError));
            assert_eq!(Position::from_fen_str("K1k5/8/8/8/8/8/8/8 w"), Err(ParseError));
            assert_eq!(Position::from_fen_str("K1k5/8/8/8/8/8/8/8 w X - 0 1"), Err(ParseError));
            assert_eq!(Position::from_fen_str("K1k5/8/8/8/8/8/8/8 w -"), Err(ParseError));
            assert_eq!(Position::from_fen_str("K1k5/8/8/8/8/8/8/8 w - - x 1"), Err(ParseError));
            assert_eq!(Position::from_fen_str("K1k5/8/8/8/8/8/8/8 w - - 0 x"), Err(ParseError));
            assert_eq!(Position::from_fen_str("K1k5/8/8/8/8/8/8/8 w - - 0 1 x"), Err(ParseError));
        }

        // 6. Missing clocks default to 0 and 1
        #[test]
        fn missing_clocks_use_defaults() {
            let p = pos("K1k5/8/8/8/8/8/8/8 b - -");
            assert_eq!(p.turn(), Black);
            assert_eq!(p.halfmove_clock(), 0);
            assert_eq!(p.fullmove_number(), 1);
            let p = pos("K1k5/8/8/8/8/8/8/8 b - - 17 42");
            assert_eq!(p.halfmove_clock(), 17);
            assert_eq!(p.fullmove_number(), 42);
        }

        // 7. Invalid positions are rejected
        #[test]
        fn invalid_positions_return_error() {
            assert_eq!(Position::from_fen_str("K1k5/8/8/8/8/8/7K/8 w - - 0 1"),
                Err(InvalidKingCount));
            assert_eq!(Position::from_fen_str("K7/8/8/8/8/8/8/8 w - - 0 1"), Err(InvalidKingCount));
            assert_eq!(Position::from_fen_str("K1k4p/8/8/8/8/8/8/8 w - - 0 1"),
                Err(InvalidPawnRank));
            assert_eq!(Position::from_fen_str("K1k5/8/8/8/8/8/8/P7 w - - 0 1"),
                Err(InvalidPawnRank));
            assert_eq!(Position::from_fen_str("K1k5/8/8/8/8/8/8/2R5 w - - 0 1"),
                Err(KingCapturable));
            assert_eq!(Position::from_fen_str("K1k5/8/7p/7p/8/8/8/8 w - h6 0 1"),
                Err(EnPassantSquareOccupied));
            assert_eq!(Position::from_fen_str("K1k5/8/8/8/8/8/8/8 w - h6 0 1"),
                Err(MissingEnPassantPawn));
            assert_eq!(Position::from_fen_str("2k5/8/8/8/8/8/7K/R6R w K - 0 1"),
                Err(InvalidCastlingFlags));
            assert_eq!(Position::from_fen_str("4k3/8/8/8/8/8/8/4K3 w Q - 0 1"),
                Err(InvalidCastlingFlags));
            assert_eq!(Position::from_fen_str("r3k3/8/8/8/8/8/8/4K3 w k - 0 1"),
                Err(InvalidCastlingFlags));
        }

        // 8. to_fen_str() returns the input fen string
        #[test]
        fn back_to_identical_fen() {
            for fen in [START_FEN, KIWIPETE, "8/8/8/3k4/3pP3/8/8/4K3 b - e3 0 37"].iter() {
                assert_eq!(pos(fen).to_fen_str(), *fen);
                assert_eq!(pos(fen).to_string().parse::<Position>(), Ok(pos(fen)));
            }
        }
    }

    #[test]
    fn castling_rights_text() {
        assert_eq!(CastlingRights::ALL.to_string(), "KQkq");
        assert_eq!(CastlingRights::NONE.to_string(), "-");
        assert_eq!("Kq".parse::<CastlingRights>().expect("valid"),
            CastlingRights(CastlingRights::WHITE_KING_SIDE.0 | CastlingRights::BLACK_QUEEN_SIDE.0));
        assert!("".parse::<CastlingRights>().is_err());
        assert!("KX".parse::<CastlingRights>().is_err());
        assert_eq!(CastlingRights::WHITE_QUEEN_SIDE.flipped(), CastlingRights::BLACK_QUEEN_SIDE);
    }

    #[test]
    fn piece_lists_match_bitboards() {
        let p = pos(KIWIPETE);
        for &c in Color::ALL.iter() {
            for &k in Piece::ALL.iter() {
                let from_list: Bitboard = p.piece_squares(c, k).iter().copied().collect();
                assert_eq!(from_list, p.pieces(c, k));
                assert_eq!(p.piece_count(c, k), p.pieces(c, k).len());
            }
        }
    }

    #[test]
    fn castling_moves_king_and_rook() {
        let mut p = pos(KIWIPETE);
        let before = p.clone();
        let mv = Move::new_castling(Square::E1, Square::C1);
        let info = p.do_move(mv);
        assert_eq!(p.piece_at(Square::C1), Some((White, King)));
        assert_eq!(p.piece_at(Square::D1), Some((White, Rook)));
        assert_eq!(p.piece_at(Square::A1), None);
        assert_eq!(p.castling_rights().to_string(), "kq");
        assert_eq!(p.turn(), Black);
        p.undo_move(mv, info);
        assert_eq!(p, before);
    }

    #[test]
    fn en_passant_capture_removes_the_pawn_behind() {
        let mut p = pos("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3");
        let before = p.clone();
        let mv = p.parse_move("e5f6").expect("legal");
        let info = p.do_move(mv);
        assert!(info.en_passant);
        assert_eq!(info.captured, Some(Pawn));
        assert_eq!(p.piece_at(Square::F5), None);
        assert_eq!(p.piece_at(Square::F6), Some((White, Pawn)));
        assert_eq!(p.calc_zobrist(), (p.zobrist_key(), p.pawn_key()));
        p.undo_move(mv, info);
        assert_eq!(p, before);
    }

    #[test]
    fn promotion_places_the_new_piece() {
        let mut p = pos("1r5k/P7/8/8/8/8/8/K7 w - - 0 1");
        let before = p.clone();
        let mv = p.parse_move("a7b8n").expect("legal");
        let info = p.do_move(mv);
        assert_eq!(p.piece_at(Square::B8), Some((White, Knight)));
        assert_eq!(p.piece_count(White, Pawn), 0);
        assert_eq!(p.piece_count(Black, Rook), 0);
        assert_eq!(p.halfmove_clock(), 0);
        p.undo_move(mv, info);
        assert_eq!(p, before);
    }

    #[test]
    fn double_push_sets_en_passant_square() {
        let mut p = Position::new();
        let info = p.do_move(p.parse_move("e2e4").expect("legal"));
        assert_eq!(p.ep_square(), Some(Square::E3));
        assert_eq!(info.ep_square, None);
        p.do_move(p.parse_move("g8f6").expect("legal"));
        assert_eq!(p.ep_square(), None);
        assert_eq!(p.fullmove_number(), 2);
        assert_eq!(p.halfmove_clock(), 1);
    }

    #[test]
    fn rook_capture_removes_castling_rights() {
        let mut p = pos("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        p.do_move(p.parse_move("a1a8").expect("legal"));
        assert_eq!(p.castling_rights().to_string(), "Kk");
        assert_eq!(p.calc_zobrist().0, p.zobrist_key());
    }

    #[test]
    fn parse_move_rejects_illegal_and_malformed_text() {
        let p = Position::new();
        assert_eq!(p.parse_move("e2e5"), Err(Error::IllegalMove));
        assert_eq!(p.parse_move("e1g1"), Err(Error::IllegalMove));
        assert_eq!(p.parse_move("e2"), Err(Error::ParseError));
        assert_eq!(p.parse_move("z2z4"), Err(Error::ParseError));
        assert_eq!(p.parse_move("e7e8x"), Err(Error::ParseError));
        assert!(p.parse_move("g1f3").is_ok());
    }

    #[test]
    fn null_move_round_trip() {
        let mut p = pos("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2");
        let before = p.clone();
        let info = p.do_null_move();
        assert_eq!(p.turn(), Black);
        assert_eq!(p.ep_square(), None);
        assert_eq!(p.calc_zobrist().0, p.zobrist_key());
        p.undo_null_move(info);
        assert_eq!(p, before);
    }

    #[test]
    fn repetition_is_detected() {
        let mut p = Position::new();
        for mv in ["g1f3", "g8f6", "f3g1", "f6g8"].iter() {
            assert!(!p.is_repetition());
            p.do_move(p.parse_move(mv).expect("legal"));
        }
        assert!(p.is_repetition());
        p.do_move(p.parse_move("e2e4").expect("legal"));
        assert!(!p.is_repetition());
    }

    #[test]
    fn insufficient_material() {
        assert!(pos("8/8/4k3/8/8/3K4/8/8 w - - 0 1").has_insufficient_material());
        assert!(pos("8/8/4k3/8/8/3KN3/8/8 w - - 0 1").has_insufficient_material());
        assert!(pos("8/8/4kb2/8/8/3KB3/8/8 w - - 0 1").has_insufficient_material());
        assert!(!pos("8/8/4k1b1/8/8/3KB3/8/8 w - - 0 1").has_insufficient_material());
        assert!(!pos("8/8/4k3/8/8/3KNN2/8/8 w - - 0 1").has_insufficient_material());
        assert!(!pos("8/8/4k3/8/8/3K4/4P3/8 w - - 0 1").has_insufficient_material());
    }

    #[test]
    fn fifty_move_rule() {
        assert!(!pos("8/8/4k3/8/8/3K4/R7/8 w - - 99 80").is_fifty_move_draw());
        assert!(pos("8/8/4k3/8/8/3K4/R7/8 w - - 100 80").is_fifty_move_draw());
    }

    #[test]
    fn attacks_and_checks() {
        let p = pos("4k3/8/8/8/1b6/8/3P4/4K2R w K - 0 1");
        assert!(!p.in_check());
        assert!(p.is_square_attacked(Square::C3, Black));
        assert!(p.is_square_attacked(Square::F2, White));
        assert_eq!(p.attackers_to(Square::E2, p.occupied()).len(), 1);

        let p = pos("4k3/8/8/8/1b6/8/8/4K2R w K - 0 1");
        assert!(p.in_check());
        assert_eq!(p.checkers(), Square::B4.into());
    }

    #[test]
    fn color_flipped_mirrors_everything() {
        let p = pos(KIWIPETE);
        let f = p.color_flipped();
        assert_eq!(f.turn(), Black);
        assert_eq!(f.piece_at(Square::E8), Some((Black, King)));
        assert_eq!(f.piece_at(Square::E2), Some((White, Queen)));
        assert_eq!(f.color_flipped(), p);
    }

    /// Plays random games and checks that every do/undo pair restores the position exactly and
    /// that the incremental keys always match keys computed from scratch.
    #[test]
    fn random_playouts_round_trip() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut list = MoveList::new();

        for start in [START_FEN, KIWIPETE, "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1"].iter() {
            for _ in 0..20 {
                let mut p = pos(start);
                for _ in 0..80 {
                    p.generate_legal(&mut list);
                    if list.is_empty() {
                        break;
                    }
                    for &mv in list.iter() {
                        let before = p.clone();
                        let info = p.do_move(mv);
                        assert_eq!(p.calc_zobrist(), (p.zobrist_key(), p.pawn_key()), "{}", mv);
                        p.undo_move(mv, info);
                        assert_eq!(p, before, "{}", mv);
                    }
                    let mv = list[rng.gen_range(0, list.len())];
                    p.do_move(mv);
                }
            }
        }
    }
}
