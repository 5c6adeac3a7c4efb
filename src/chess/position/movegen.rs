//! The legal move generator
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use super::*;

////////////////////////////////////////////////////////////////////////////////////////////////////
/// A piece that cannot leave the line between its own king and an enemy slider
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Pin {
    /// Where the pinned piece stands
    pub square: Square,
    /// The kind of the pinned piece
    pub piece: Piece,
    /// Direction from the king towards the pinned piece
    pub direction: Direction,
}

impl Pin {
    /// Squares the pinned piece may still move to, ignoring occupancy
    fn line(self, king: Square) -> Bitboard {
        ray(self.direction, king) | ray(self.direction.opposite(), king)
    }
}

/// Pins found for one king, indexed by direction
type Pins = [Option<Pin>; Direction::COUNT];

/// Which moves a call to the generator wants
#[derive(Copy, Clone, PartialEq, Eq)]
enum Kind {
    Legal,
    Tactical,
}

impl Position {
    /// Returns the absolute pins against the king of the side to move
    pub fn pins(&self) -> Vec<Pin> {
        let mut pins = [None; Direction::COUNT];
        self.find_pins(&mut pins);
        pins.iter().filter_map(|p| *p).collect()
    }

    /// Fills `pins` and returns the set of pinned squares
    fn find_pins(&self, pins: &mut Pins) -> Bitboard {
        let us = self.turn;
        let king = self.king_square(us);
        let occ = self.occupied();
        let own = self.by_color[us as usize];
        let enemy = self.by_color[!us as usize];
        let queens = self.by_piece[Queen as usize];
        let diagonal = (self.by_piece[Bishop as usize] | queens) & enemy;
        let orthogonal = (self.by_piece[Rook as usize] | queens) & enemy;
        let mut pinned = Bitboard::new();

        for &dir in Direction::ALL.iter() {
            let snipers = if dir.is_diagonal() { diagonal } else { orthogonal };
            let full_ray = ray(dir, king);
            if full_ray.is_disjoint(snipers) {
                continue;
            }

            let nearest = |b: Bitboard| if dir.is_positive() { b.lsb() } else { b.msb() };
            let first = match nearest(full_ray & occ) {
                Some(sq) if own.contains(sq) => sq,
                _ => continue,
            };
            if let Some(second) = nearest(ray(dir, first) & occ) {
                if snipers.contains(second) {
                    let (_, piece) = self.board[first as usize].expect("INFALLIBLE");
                    pins[dir as usize] = Some(Pin { square: first, piece, direction: dir });
                    pinned.insert(first);
                }
            }
        }

        pinned
    }

    /// Generates every legal move into `list`, replacing its contents, and returns the number of
    /// moves generated
    ///
    /// ```rust
    /// use scarecrow::chess::{MoveList, Position};
    ///
    /// let mut list = MoveList::new();
    /// assert_eq!(Position::new().generate_legal(&mut list), 20);
    /// ```
    pub fn generate_legal(&self, list: &mut MoveList) -> usize {
        self.generate(list, Kind::Legal)
    }

    /// Generates the moves searched by the quiescence search: every legal move when in check,
    /// and otherwise only captures (including en-passant) and queen promotions
    pub fn generate_tactical(&self, list: &mut MoveList) -> usize {
        self.generate(list, Kind::Tactical)
    }

    fn generate(&self, list: &mut MoveList, kind: Kind) -> usize {
        list.clear();

        let us = self.turn;
        let them = !us;
        let king = self.king_square(us);
        let occ = self.occupied();
        let own = self.by_color[us as usize];
        let enemy = self.by_color[them as usize];
        let checkers = self.attackers_to(king, occ) & enemy;
        let in_check = !checkers.is_empty();
        let quiet_ok = kind == Kind::Legal || in_check;

        // the king must not hide behind itself from a slider
        let without_king = occ ^ king.into();
        let mut king_targets = king_attacks(king) & !own;
        if !quiet_ok {
            king_targets &= enemy;
        }
        for to in king_targets {
            if !self.attacked_through(to, them, without_king) {
                list.push(Move::new(king, to));
            }
        }

        if checkers.more_than_one() {
            return list.len();
        }

        let (capture_mask, push_mask) = match checkers.lsb() {
            Some(checker) => {
                let sliding = self.board[checker as usize]
                    .map_or(false, |(_, piece)| piece.is_slider());
                (checkers, if sliding { between(king, checker) } else { Bitboard::new() })
            },
            None => (enemy, !occ),
        };
        let piece_targets = capture_mask | if quiet_ok { push_mask } else { Bitboard::new() };

        let mut pins = [None; Direction::COUNT];
        let pinned = self.find_pins(&mut pins);
        let allowed = |from: Square| -> Bitboard {
            if pinned.contains(from) {
                pins.iter()
                    .filter_map(|p| *p)
                    .find(|p| p.square == from)
                    .map_or(Bitboard::new(), |p| p.line(king))
            } else {
                Bitboard::FULL
            }
        };

        for from in self.pieces(us, Knight) & !pinned {
            for to in knight_attacks(from) & piece_targets {
                list.push(Move::new(from, to));
            }
        }

        for &piece in [Bishop, Rook, Queen].iter() {
            for from in self.pieces(us, piece) {
                for to in piece_attacks(piece, us, from, occ) & piece_targets & allowed(from) {
                    list.push(Move::new(from, to));
                }
            }
        }

        self.generate_pawn_moves(list, kind, quiet_ok, capture_mask, push_mask, &allowed);

        if kind == Kind::Legal && !in_check {
            self.generate_castling(list);
        }

        list.len()
    }

    fn generate_pawn_moves<F>(&self,
        list: &mut MoveList,
        kind: Kind,
        quiet_ok: bool,
        capture_mask: Bitboard,
        push_mask: Bitboard,
        allowed: &F,
    ) where F: Fn(Square) -> Bitboard {
        let us = self.turn;
        let king = self.king_square(us);
        let occ = self.occupied();
        let last_rank = Bitboard::from(us.relative_rank(Rank::R8));
        let pushes = if quiet_ok { push_mask } else { push_mask & last_rank };

        let push = |list: &mut MoveList, from: Square, to: Square| {
            if last_rank.contains(to) {
                list.push(Move::new_promotion(from, to, Queen));
                if kind == Kind::Legal || quiet_ok {
                    list.push(Move::new_promotion(from, to, Knight));
                    list.push(Move::new_promotion(from, to, Rook));
                    list.push(Move::new_promotion(from, to, Bishop));
                }
            } else {
                list.push(Move::new(from, to));
            }
        };

        for from in self.pieces(us, Pawn) {
            let line = allowed(from);

            if let Some(one) = from.offset(0, us.forward()) {
                if !occ.contains(one) {
                    if (pushes & line).contains(one) {
                        push(list, from, one);
                    }
                    if quiet_ok && us.relative_rank(from.rank()) == Rank::R2 {
                        if let Some(two) = one.offset(0, us.forward()) {
                            if !occ.contains(two) && (push_mask & line).contains(two) {
                                list.push(Move::new(from, two));
                            }
                        }
                    }
                }
            }

            let attacks = pawn_attacks(us, from);
            for to in attacks & capture_mask & line {
                push(list, from, to);
            }

            if let Some(ep) = self.ep_square {
                if attacks.contains(ep) && line.contains(ep) {
                    let captured = Square::from_coord(ep.file(), from.rank());
                    if capture_mask.contains(captured) || push_mask.contains(ep) {
                        // both pawns leave the board at once, which may uncover the king
                        let after = occ ^ Bitboard::from(from) ^ captured.into() ^ ep.into();
                        let bishops = self.pieces(!us, Bishop) | self.pieces(!us, Queen);
                        let rooks = self.pieces(!us, Rook) | self.pieces(!us, Queen);
                        if bishop_attacks(king, after).is_disjoint(bishops)
                            && rook_attacks(king, after).is_disjoint(rooks) {
                            list.push(Move::new(from, ep));
                        }
                    }
                }
            }
        }
    }

    fn generate_castling(&self, list: &mut MoveList) {
        let us = self.turn;
        let them = !us;
        let occ = self.occupied();
        let king = Square::E1.relative_to(us);

        let sides = [
            (CastlingRights::king_side(us), Square::H1, [Square::F1, Square::G1]),
            (CastlingRights::queen_side(us), Square::A1, [Square::D1, Square::C1]),
        ];
        for &(right, rook, passage) in sides.iter() {
            if !self.castling.contains(right) {
                continue;
            }
            let rook = rook.relative_to(us);
            if between(king, rook).intersects(occ) {
                continue;
            }
            if passage.iter().any(|sq| self.is_square_attacked(sq.relative_to(us), them)) {
                continue;
            }
            list.push(Move::new_castling(king, passage[1].relative_to(us)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legal(fen: &str) -> Vec<String> {
        let pos = Position::from_fen_str(fen).expect("valid fen");
        let mut list = MoveList::new();
        pos.generate_legal(&mut list);
        let mut moves: Vec<_> = list.iter().map(|mv| mv.to_string()).collect();
        moves.sort();
        moves
    }

    fn tactical(fen: &str) -> Vec<String> {
        let pos = Position::from_fen_str(fen).expect("valid fen");
        let mut list = MoveList::new();
        pos.generate_tactical(&mut list);
        let mut moves: Vec<_> = list.iter().map(|mv| mv.to_string()).collect();
        moves.sort();
        moves
    }

    #[test]
    fn double_check_allows_only_king_moves() {
        // knight on f3 and rook on e8 both check the king on e1
        let moves = legal("4r2k/8/8/8/8/5n2/3P4/4K3 w - - 0 1");
        assert!(!moves.is_empty());
        assert!(moves.iter().all(|m| m.starts_with("e1")));
    }

    #[test]
    fn single_check_can_be_blocked_or_captured() {
        // the bishop can block on e3 and the queen on e5
        let moves = legal("4r1k1/8/8/8/8/8/5B2/Q3K3 w - - 0 1");
        assert!(moves.contains(&"f2e3".to_string()));
        assert!(!moves.contains(&"f2g3".to_string()));
        assert!(!moves.contains(&"a1a2".to_string()));
        assert!(moves.contains(&"a1e5".to_string()));
        assert!(!moves.contains(&"e1e2".to_string()));
    }

    #[test]
    fn knight_check_cannot_be_blocked() {
        let moves = legal("7k/8/8/8/8/3n4/8/R3K3 w - - 0 1");
        assert!(moves.iter().all(|m| m.starts_with("e1")));
    }

    #[test]
    fn pinned_pieces_stay_on_the_pin_line() {
        // the rook on e4 is pinned by the rook on e8, the knight on d2 by the bishop on b4
        let pos = Position::from_fen_str("4r2k/8/8/8/1b2R3/8/3N4/4K3 w - - 0 1")
            .expect("valid fen");
        let mut pins = pos.pins();
        pins.sort_by_key(|p| p.square);
        assert_eq!(pins, vec![
            Pin { square: Square::D2, piece: Knight, direction: Direction::NorthWest },
            Pin { square: Square::E4, piece: Rook, direction: Direction::North },
        ]);

        let moves = legal("4r2k/8/8/8/1b2R3/8/3N4/4K3 w - - 0 1");
        assert!(!moves.iter().any(|m| m.starts_with("d2")));
        assert!(moves.contains(&"e4e8".to_string()));
        assert!(moves.contains(&"e4e2".to_string()));
        assert!(!moves.contains(&"e4a4".to_string()));
    }

    #[test]
    fn pinned_pawn_may_capture_the_pinner() {
        let moves = legal("7k/8/8/8/8/2b5/3P4/4K3 w - - 0 1");
        assert!(moves.contains(&"d2c3".to_string()));
        assert!(!moves.contains(&"d2d3".to_string()));
        assert!(!moves.contains(&"d2d4".to_string()));
    }

    #[test]
    fn king_cannot_retreat_along_the_checking_ray() {
        let moves = legal("7k/8/8/8/r3K3/8/8/8 w - - 0 1");
        assert!(!moves.contains(&"e4f4".to_string()));
        assert!(moves.contains(&"e4e5".to_string()));
    }

    #[test]
    fn en_passant_discovered_check_along_the_rank() {
        // capturing en passant would remove both pawns from the fifth rank
        let moves = legal("8/8/8/K2pP2r/8/8/8/7k w - d6 0 1");
        assert!(!moves.contains(&"e5d6".to_string()));
        assert!(moves.contains(&"e5e6".to_string()));
    }

    #[test]
    fn en_passant_resolves_a_pawn_check() {
        let moves = legal("8/8/8/2k5/3Pp3/8/8/4K3 b - d3 0 1");
        assert!(moves.contains(&"e4d3".to_string()));
        assert!(moves.contains(&"c5d4".to_string()));
    }

    #[test]
    fn en_passant_blocked_by_a_diagonal_pin() {
        let moves = legal("7k/6b1/8/3pP3/8/2K5/8/8 w - d6 0 1");
        assert!(!moves.contains(&"e5d6".to_string()));
        assert!(!moves.contains(&"e5e6".to_string()));
    }

    #[test]
    fn castling_rules() {
        let moves = legal("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert!(moves.contains(&"e1g1".to_string()));
        assert!(moves.contains(&"e1c1".to_string()));

        // b1 occupied blocks queen side castling even though the king never crosses it
        let moves = legal("r3k2r/8/8/8/8/8/8/RN2K2R w KQkq - 0 1");
        assert!(!moves.contains(&"e1c1".to_string()));
        assert!(moves.contains(&"e1g1".to_string()));

        // f1 attacked
        let moves = legal("r3kr2/8/8/8/8/8/8/R3K2R w KQq - 0 1");
        assert!(!moves.contains(&"e1g1".to_string()));
        assert!(moves.contains(&"e1c1".to_string()));

        // b1 attacked does not matter
        let moves = legal("rr2k3/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        assert!(moves.contains(&"e1c1".to_string()));

        // no castling out of check
        let moves = legal("r3k2r/8/8/8/8/8/4r3/R3K2R w KQkq - 0 1");
        assert!(!moves.contains(&"e1g1".to_string()));
        assert!(!moves.contains(&"e1c1".to_string()));
    }

    #[test]
    fn promotions_generate_four_pieces() {
        let moves = legal("7k/P7/8/8/8/8/8/K7 w - - 0 1");
        for m in ["a7a8q", "a7a8r", "a7a8b", "a7a8n"].iter() {
            assert!(moves.contains(&m.to_string()));
        }
    }

    #[test]
    fn tactical_moves_are_captures_and_queen_promotions() {
        let moves = tactical("6nk/P7/8/3p4/4P3/8/8/K7 w - - 0 1");
        assert_eq!(moves, vec!["a7a8q", "e4d5"]);

        // in check every evasion counts
        let moves = tactical("k7/8/8/8/8/8/8/r3K3 w - - 0 1");
        assert_eq!(moves, legal("k7/8/8/8/8/8/8/r3K3 w - - 0 1"));
        assert!(moves.contains(&"e1e2".to_string()));
        assert!(!moves.contains(&"e1f1".to_string()));
    }

    #[test]
    fn checkmate_and_stalemate_have_no_moves() {
        assert!(legal("R5k1/5ppp/8/8/8/8/8/6K1 b - - 0 1").is_empty());
        assert!(legal("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").is_empty());
    }
}
