//! Search limits
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::time::Duration;
use crate::chess::{Color, Move};

////////////////////////////////////////////////////////////////////////////////////////////////////
/// The limits placed on a single search, as given by the `go` command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Limits {
    /// Maximum depth in plies
    pub depth: Option<usize>,
    /// Maximum number of nodes
    pub nodes: Option<u64>,
    /// Exact amount of time to search
    pub movetime: Option<Duration>,
    /// Time remaining on each side's clock, indexed by color
    pub time: [Option<Duration>; Color::COUNT],
    /// Increment per move for each side, indexed by color
    pub inc: [Option<Duration>; Color::COUNT],
    /// Moves until the next time control
    pub movestogo: Option<usize>,
    /// Search until told to stop
    pub infinite: bool,
    /// Search on the opponent's time until told the ponder move was played
    pub ponder: bool,
    /// Only these moves are considered at the root, if not empty
    pub searchmoves: Vec<Move>,
}

impl Limits {
    /// Depth searched when no other limit is given
    pub const DEFAULT_DEPTH: usize = 7;

    /// Limits which only restrict depth
    pub fn depth(depth: usize) -> Limits {
        Limits { depth: Some(depth), ..Limits::default() }
    }

    /// Limits which only restrict time
    pub fn movetime(time: Duration) -> Limits {
        Limits { movetime: Some(time), ..Limits::default() }
    }

    /// Returns `true` if the clock of `color` is being managed
    pub fn is_timed(&self, color: Color) -> bool {
        self.time[color as usize].is_some()
    }

    /// Returns `true` if nothing would end a search by `color` besides running out of moves.
    /// The opponent's clock doesn't count.
    pub fn is_unlimited(&self, color: Color) -> bool {
        !self.infinite
            && !self.ponder
            && self.depth.is_none()
            && self.nodes.is_none()
            && self.movetime.is_none()
            && !self.is_timed(color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_searches() {
        assert!(Limits::default().is_unlimited(Color::White));
        assert!(!Limits::depth(3).is_unlimited(Color::White));
        assert!(!Limits { infinite: true, ..Limits::default() }.is_unlimited(Color::Black));

        let mut limits = Limits::default();
        limits.time[Color::Black as usize] = Some(Duration::from_secs(60));
        assert!(limits.is_timed(Color::Black));
        assert!(!limits.is_unlimited(Color::Black));
        assert!(limits.is_unlimited(Color::White));
    }
}
