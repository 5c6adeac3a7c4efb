//! The engine
//
//  Copyright 2019 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::time::Duration;
use log::{debug, info};
use crate::chess::Move;
use crate::protocol::{Protocol, Request, SearchAction};

mod eval;
pub use eval::{Evaluator, Score, piece_val};

pub mod weights;
mod pawns;
pub mod endgame;
pub mod bitbase;
pub mod hash;
pub mod ordering;
pub mod limits;
pub mod time;
pub mod search;

pub use limits::Limits;
pub use search::{Search, SearchConfig, SearchControl, StopFlag};

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Thinking output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thinking {
    score: Score,
    depth: usize,
    seldepth: usize,
    time: Duration,
    nodes: u64,
    pv: Vec<Move>,
}

impl Thinking {
    fn new() -> Self {
        Thinking {
            score: -Score::infinity(),
            depth: 0,
            seldepth: 0,
            time: Duration::from_secs(0),
            nodes: 0,
            pv: Vec::new(),
        }
    }

    /// Returns the estimated score for the principle variation.
    pub fn score(&self) -> Score {
        self.score
    }

    /// Returns the search depth that was reached.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the greatest number of plies from the root reached by any line.
    pub fn seldepth(&self) -> usize {
        self.seldepth
    }

    /// Returns the amount of time used for the search.
    pub fn time(&self) -> Duration {
        self.time
    }

    /// Returns the number of nodes searched.
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Returns the average number of nodes searched per second.
    pub fn nps(&self) -> u64 {
        (u128::from(self.nodes) * 1000 / (self.time.as_millis() + 1)) as u64
    }

    /// Returns the principle variation.
    pub fn pv(&self) -> &[Move] {
        &self.pv
    }

    /// Returns the best move found in the search.
    pub fn best_move(&self) -> Option<Move> {
        self.pv.first().copied()
    }

    /// Returns the best move to ponder on.
    pub fn ponder_move(&self) -> Option<Move> {
        self.pv.get(1).copied()
    }
}

/// Passes polls and reports between the search and the protocol, remembering whether the search
/// was aborted
struct Control<'a, T: Protocol> {
    protocol: &'a mut T,
    aborted: bool,
}

impl<'a, T: Protocol> SearchControl for Control<'a, T> {
    fn poll(&mut self) -> Option<SearchAction> {
        let action = self.protocol.check_input();
        if action == Some(SearchAction::Abort) {
            self.aborted = true;
        }
        action
    }

    fn report(&mut self, thinking: &Thinking) {
        self.protocol.send_thinking(thinking);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// The engine
#[derive(Debug)]
pub struct Engine<T> where T: Protocol {
    protocol: T,
    search: Search,
}

impl<T> Engine<T> where T: Protocol {
    /// Creates a new Engine.
    pub fn new(protocol: T, search: Search) -> Self {
        Engine {
            protocol,
            search,
        }
    }

    /// Runs the engine until the protocol asks it to quit.
    pub fn run(&mut self) {
        loop {
            match self.protocol.next_request() {
                Request::Search => self.search(),
                Request::NewGame => {
                    debug!("new game");
                    self.search.clear();
                },
                Request::ClearHash => self.search.clear_hash(),
                Request::SetHash(megabytes) => {
                    info!("hash table size set to {} MB", megabytes);
                    self.search.resize_hash(megabytes);
                },
                Request::SetWeights(weights) => self.search.set_weights(weights),
                Request::Quit => break,
            }
        }
    }

    /// Searches the protocol's current position, and sends the move unless the search was
    /// aborted.
    fn search(&mut self) {
        let mut pos = self.protocol.position().clone();
        let limits = self.protocol.limits().clone();
        debug!("searching: {}", pos);

        let mut control = Control { protocol: &mut self.protocol, aborted: false };
        let thinking = self.search.run(&mut pos, &limits, &mut control);

        if !control.aborted {
            self.protocol.send_move(&thinking);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::Position;

    #[test]
    fn thinking_reports_moves_and_rates() {
        let pos = Position::new();
        let mut thinking = Thinking::new();
        assert_eq!(thinking.best_move(), None);
        assert_eq!(thinking.nps(), 0);

        thinking.pv = vec![pos.parse_move("e2e4").expect("legal"),
            Move::new(crate::chess::Square::E7, crate::chess::Square::E5)];
        thinking.nodes = 5_000;
        thinking.time = Duration::from_millis(999);
        assert_eq!(thinking.best_move().map(|mv| mv.to_string()), Some("e2e4".to_string()));
        assert_eq!(thinking.ponder_move().map(|mv| mv.to_string()), Some("e7e5".to_string()));
        assert_eq!(thinking.nps(), 5_000);
    }
}
