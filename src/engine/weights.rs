//! Evaluation weights and their binary file format
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
//! A weight file is a flat sequence of little-endian `i16` values:
//!
//! 1. phase weights for knight, bishop, rook and queen
//! 2. a block for the middlegame, then the same block for the endgame:
//!    * for pawn through queen, the piece value followed by 64 piece-square values (A1 to H8)
//!    * 64 piece-square values for the king
//!    * a mobility bonus for each of the six piece kinds
//!    * rook on semi-open file, rook on open file, bishop pair, passed pawn, connected rooks,
//!      doubled pawn, isolated pawn
//! 3. optionally, an extension block for the middlegame and then the endgame: tripled pawn,
//!    backward pawn, king shield, knight outpost, bishop outpost
//!
//! A file that ends after the second part uses the default extension values.
use std::fmt;
use std::io;
use std::fs;
use std::path::Path;
use crate::chess::{Piece, Square};

////////////////////////////////////////////////////////////////////////////////////////////////////
/// A stage of the game, with its own set of weights
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Phase {
    Middlegame = 0,
    Endgame = 1,
}

impl Phase {
    /// The number of phases
    pub const COUNT: usize = 2;

    /// Both phases, in file order
    pub const ALL: [Phase; Phase::COUNT] = [Phase::Middlegame, Phase::Endgame];
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// An error reading or writing a weight file
#[derive(Debug)]
pub enum WeightsError {
    /// The file could not be read or written
    Io(io::Error),
    /// The file ended before all required values were read
    Truncated,
    /// The file has bytes left over after the last value
    TrailingData,
}

impl fmt::Display for WeightsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightsError::Io(err) => write!(f, "weight file i/o error: {}", err),
            WeightsError::Truncated => write!(f, "weight file is truncated"),
            WeightsError::TrailingData => write!(f, "weight file has trailing data"),
        }
    }
}

impl std::error::Error for WeightsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WeightsError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for WeightsError {
    fn from(err: io::Error) -> Self {
        WeightsError::Io(err)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// The weights used in one phase of the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseWeights {
    /// Material value for pawn through queen
    pub piece_values: [i16; Piece::COUNT - 1],
    /// Piece-square tables for every piece kind, from White's point of view
    pub piece_squares: [[i16; Square::COUNT]; Piece::COUNT],
    /// Bonus per safe square attacked, for every piece kind
    pub mobility: [i16; Piece::COUNT],
    /// Rook on a file with only enemy pawns
    pub rook_semiopen_file: i16,
    /// Rook on a file without pawns
    pub rook_open_file: i16,
    /// Bishops on both square colors
    pub bishop_pair: i16,
    /// Pawn with no enemy pawns in front of it or on adjacent files
    pub passed_pawn: i16,
    /// Two rooks seeing each other
    pub connected_rooks: i16,
    /// File with more than one own pawn
    pub doubled_pawn: i16,
    /// Pawn without own pawns on adjacent files
    pub isolated_pawn: i16,
    /// File with more than two own pawns, in addition to `doubled_pawn`
    pub tripled_pawn: i16,
    /// Pawn that can no longer be supported by other pawns and whose stop square is controlled by
    /// an enemy pawn
    pub backward_pawn: i16,
    /// Own pawn directly in front of the king
    pub king_shield: i16,
    /// Knight on a pawn-defended square that enemy pawns can never attack
    pub knight_outpost: i16,
    /// Bishop on a pawn-defended square that enemy pawns can never attack
    pub bishop_outpost: i16,
}

impl PhaseWeights {
    const BASE_VALUES: usize = (Piece::COUNT - 1) * (1 + Square::COUNT) + Square::COUNT
        + Piece::COUNT + 7;
    const EXTENSION_VALUES: usize = 5;

    fn read_base(&mut self, values: &mut impl Iterator<Item = i16>) -> Result<(), WeightsError> {
        let mut next = || values.next().ok_or(WeightsError::Truncated);

        for piece in 0..Piece::COUNT - 1 {
            self.piece_values[piece] = next()?;
            for sq in 0..Square::COUNT {
                self.piece_squares[piece][sq] = next()?;
            }
        }
        for sq in 0..Square::COUNT {
            self.piece_squares[Piece::King as usize][sq] = next()?;
        }
        for piece in 0..Piece::COUNT {
            self.mobility[piece] = next()?;
        }
        self.rook_semiopen_file = next()?;
        self.rook_open_file = next()?;
        self.bishop_pair = next()?;
        self.passed_pawn = next()?;
        self.connected_rooks = next()?;
        self.doubled_pawn = next()?;
        self.isolated_pawn = next()?;

        Ok(())
    }

    fn read_extension(&mut self, values: &mut impl Iterator<Item = i16>)
    -> Result<(), WeightsError> {
        let mut next = || values.next().ok_or(WeightsError::Truncated);

        self.tripled_pawn = next()?;
        self.backward_pawn = next()?;
        self.king_shield = next()?;
        self.knight_outpost = next()?;
        self.bishop_outpost = next()?;

        Ok(())
    }

    fn write_base(&self, out: &mut Vec<i16>) {
        for piece in 0..Piece::COUNT - 1 {
            out.push(self.piece_values[piece]);
            out.extend_from_slice(&self.piece_squares[piece]);
        }
        out.extend_from_slice(&self.piece_squares[Piece::King as usize]);
        out.extend_from_slice(&self.mobility);
        out.extend_from_slice(&[
            self.rook_semiopen_file,
            self.rook_open_file,
            self.bishop_pair,
            self.passed_pawn,
            self.connected_rooks,
            self.doubled_pawn,
            self.isolated_pawn,
        ]);
    }

    fn write_extension(&self, out: &mut Vec<i16>) {
        out.extend_from_slice(&[
            self.tripled_pawn,
            self.backward_pawn,
            self.king_shield,
            self.knight_outpost,
            self.bishop_outpost,
        ]);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// The complete set of evaluation weights
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weights {
    /// How much each knight, bishop, rook and queen on the board counts toward the middlegame
    pub phase_weights: [i16; 4],
    /// The weights for each phase, indexed by `Phase`
    pub phases: [PhaseWeights; Phase::COUNT],
}

impl Weights {
    const HEADER_VALUES: usize = 4;
    const BASE_VALUES: usize = Self::HEADER_VALUES + Phase::COUNT * PhaseWeights::BASE_VALUES;
    const FULL_VALUES: usize = Self::BASE_VALUES + Phase::COUNT * PhaseWeights::EXTENSION_VALUES;

    /// Returns the weights for `phase`
    pub fn phase(&self, phase: Phase) -> &PhaseWeights {
        &self.phases[phase as usize]
    }

    /// Returns the phase weight of a single piece. Pawns and kings do not count.
    pub fn phase_weight(&self, piece: Piece) -> i32 {
        match piece {
            Piece::Knight | Piece::Bishop | Piece::Rook | Piece::Queen =>
                i32::from(self.phase_weights[piece as usize - 1]),
            _ => 0,
        }
    }

    /// Returns the phase weight of the material in the starting position, which counts as a pure
    /// middlegame
    pub fn max_phase(&self) -> i32 {
        2 * (2 * self.phase_weight(Piece::Knight)
            + 2 * self.phase_weight(Piece::Bishop)
            + 2 * self.phase_weight(Piece::Rook)
            + self.phase_weight(Piece::Queen))
    }

    /// Reads weights from the file at `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Weights, WeightsError> {
        Self::from_bytes(&fs::read(path)?)
    }

    /// Writes the weights, including the extension block, to the file at `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), WeightsError> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// Parses weights from the contents of a weight file
    pub fn from_bytes(bytes: &[u8]) -> Result<Weights, WeightsError> {
        let count = bytes.len() / 2;
        if count > Self::FULL_VALUES || (count == Self::FULL_VALUES && bytes.len() % 2 != 0) {
            return Err(WeightsError::TrailingData);
        }
        if bytes.len() % 2 != 0 || (count != Self::BASE_VALUES && count != Self::FULL_VALUES) {
            return Err(WeightsError::Truncated);
        }

        let mut values = bytes.chunks_exact(2).map(|b| i16::from_le_bytes([b[0], b[1]]));
        let mut weights = Weights::default();

        for w in weights.phase_weights.iter_mut() {
            *w = values.next().ok_or(WeightsError::Truncated)?;
        }
        for phase in weights.phases.iter_mut() {
            phase.read_base(&mut values)?;
        }
        if count == Self::FULL_VALUES {
            for phase in weights.phases.iter_mut() {
                phase.read_extension(&mut values)?;
            }
        }

        Ok(weights)
    }

    /// Returns the contents of a weight file holding these weights
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut values = Vec::with_capacity(Self::FULL_VALUES);
        values.extend_from_slice(&self.phase_weights);
        for phase in self.phases.iter() {
            phase.write_base(&mut values);
        }
        for phase in self.phases.iter() {
            phase.write_extension(&mut values);
        }

        values.iter().flat_map(|v| v.to_le_bytes().to_vec()).collect()
    }
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            phase_weights: [1, 1, 2, 4],
            phases: [
                PhaseWeights {
                    piece_values: [100, 320, 330, 500, 900],
                    piece_squares: [
                        MG_PAWN_TABLE, KNIGHT_TABLE, BISHOP_TABLE, MG_ROOK_TABLE, QUEEN_TABLE,
                        MG_KING_TABLE,
                    ],
                    mobility: [1, 4, 5, 2, 1, 0],
                    rook_semiopen_file: 10,
                    rook_open_file: 20,
                    bishop_pair: 30,
                    passed_pawn: 10,
                    connected_rooks: 10,
                    doubled_pawn: -10,
                    isolated_pawn: -10,
                    tripled_pawn: -10,
                    backward_pawn: -8,
                    king_shield: 10,
                    knight_outpost: 20,
                    bishop_outpost: 10,
                },
                PhaseWeights {
                    piece_values: [120, 300, 320, 520, 950],
                    piece_squares: [
                        EG_PAWN_TABLE, KNIGHT_TABLE, BISHOP_TABLE, [0; Square::COUNT], QUEEN_TABLE,
                        EG_KING_TABLE,
                    ],
                    mobility: [2, 4, 5, 4, 2, 2],
                    rook_semiopen_file: 5,
                    rook_open_file: 10,
                    bishop_pair: 50,
                    passed_pawn: 30,
                    connected_rooks: 5,
                    doubled_pawn: -20,
                    isolated_pawn: -15,
                    tripled_pawn: -20,
                    backward_pawn: -10,
                    king_shield: 0,
                    knight_outpost: 10,
                    bishop_outpost: 5,
                },
            ],
        }
    }
}

const MG_PAWN_TABLE: [i16; Square::COUNT] = [
//    a    b    c    d    e    f    g    h
      0,   0,   0,   0,   0,   0,   0,   0, // 1
      0,   5,   5, -20, -20,   5,   5,   0, // 2
      5,   0,  -5,   0,   0,  -5,   0,   5, // 3
      0,   0,   5,  20,  20,   5,   0,   0, // 4
      5,   5,  10,  25,  25,  10,   5,   5, // 5
     10,  10,  20,  30,  30,  20,  10,  10, // 6
     30,  30,  30,  30,  30,  30,  30,  30, // 7
      0,   0,   0,   0,   0,   0,   0,   0, // 8
];

const EG_PAWN_TABLE: [i16; Square::COUNT] = [
//    a    b    c    d    e    f    g    h
      0,   0,   0,   0,   0,   0,   0,   0, // 1
      0,   0,   0,   0,   0,   0,   0,   0, // 2
      5,   5,   5,   5,   5,   5,   5,   5, // 3
     10,  10,  10,  10,  10,  10,  10,  10, // 4
     20,  20,  20,  20,  20,  20,  20,  20, // 5
     35,  35,  35,  35,  35,  35,  35,  35, // 6
     60,  60,  60,  60,  60,  60,  60,  60, // 7
      0,   0,   0,   0,   0,   0,   0,   0, // 8
];

const KNIGHT_TABLE: [i16; Square::COUNT] = [
//    a    b    c    d    e    f    g    h
    -50, -40, -30, -30, -30, -30, -40, -50, // 1
    -40, -20,   0,   5,   5,   0, -20, -40, // 2
    -30,   5,  10,  15,  15,  10,   5, -30, // 3
    -30,   0,  15,  20,  20,  15,   0, -30, // 4
    -30,   5,  15,  20,  20,  15,   5, -30, // 5
    -30,   0,  10,  15,  15,  10,   0, -30, // 6
    -40, -20,   0,   0,   0,   0, -20, -40, // 7
    -50, -40, -30, -30, -30, -30, -40, -50, // 8
];

const BISHOP_TABLE: [i16; Square::COUNT] = [
//    a    b    c    d    e    f    g    h
    -20, -10, -10, -10, -10, -10, -10, -20, // 1
    -10,   5,   0,   0,   0,   0,   5, -10, // 2
    -10,  10,  10,  10,  10,  10,  10, -10, // 3
    -10,   0,  10,  10,  10,  10,   0, -10, // 4
    -10,   5,   5,  10,  10,   5,   5, -10, // 5
    -10,   0,   5,  10,  10,   5,   0, -10, // 6
    -10,   0,   0,   0,   0,   0,   0, -10, // 7
    -20, -10, -10, -10, -10, -10, -10, -20, // 8
];

const MG_ROOK_TABLE: [i16; Square::COUNT] = [
//    a    b    c    d    e    f    g    h
      0,   0,   0,   5,   5,   0,   0,   0, // 1
     -5,   0,   0,   0,   0,   0,   0,  -5, // 2
     -5,   0,   0,   0,   0,   0,   0,  -5, // 3
     -5,   0,   0,   0,   0,   0,   0,  -5, // 4
     -5,   0,   0,   0,   0,   0,   0,  -5, // 5
     -5,   0,   0,   0,   0,   0,   0,  -5, // 6
      5,  10,  10,  10,  10,  10,  10,   5, // 7
      0,   0,   0,   0,   0,   0,   0,   0, // 8
];

const QUEEN_TABLE: [i16; Square::COUNT] = [
//    a    b    c    d    e    f    g    h
    -20, -10, -10,  -5,  -5, -10, -10, -20, // 1
    -10,   0,   5,   0,   0,   0,   0, -10, // 2
    -10,   5,   5,   5,   5,   5,   0, -10, // 3
      0,   0,   5,   5,   5,   5,   0,  -5, // 4
     -5,   0,   5,   5,   5,   5,   0,  -5, // 5
    -10,   0,   5,   5,   5,   5,   0, -10, // 6
    -10,   0,   0,   0,   0,   0,   0, -10, // 7
    -20, -10, -10,  -5,  -5, -10, -10, -20, // 8
];

const MG_KING_TABLE: [i16; Square::COUNT] = [
//    a    b    c    d    e    f    g    h
     20,  30,  10,   0,   0,  10,  30,  20, // 1
     20,  20,   0,   0,   0,   0,  20,  20, // 2
    -10, -20, -20, -20, -20, -20, -20, -10, // 3
    -20, -30, -30, -40, -40, -30, -30, -20, // 4
    -30, -40, -40, -50, -50, -40, -40, -30, // 5
    -30, -40, -40, -50, -50, -40, -40, -30, // 6
    -30, -40, -40, -50, -50, -40, -40, -30, // 7
    -30, -40, -40, -50, -50, -40, -40, -30, // 8
];

const EG_KING_TABLE: [i16; Square::COUNT] = [
//    a    b    c    d    e    f    g    h
    -50, -30, -30, -30, -30, -30, -30, -50, // 1
    -30, -30,   0,   0,   0,   0, -30, -30, // 2
    -30, -10,  20,  30,  30,  20, -10, -30, // 3
    -30, -10,  30,  40,  40,  30, -10, -30, // 4
    -30, -10,  30,  40,  40,  30, -10, -30, // 5
    -30, -10,  20,  30,  30,  20, -10, -30, // 6
    -30, -20, -10,   0,   0, -10, -20, -30, // 7
    -50, -40, -30, -20, -20, -30, -40, -50, // 8
];
