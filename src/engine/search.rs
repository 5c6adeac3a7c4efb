//! Iterative deepening alpha-beta search
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::cmp::{max, min};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use log::debug;
use crate::chess::{Color, Move, MoveList, MoveStack, Position, MAX_PLY};
use crate::protocol::SearchAction;
use super::{Evaluator, Score, Thinking};
use super::hash::{Bound, HashEntry, HashTable};
use super::limits::Limits;
use super::ordering::{self, MoveOrderer};
use super::time;
use super::weights::Weights;

// nodes between polls of the clock and the controller
const POLL_INTERVAL: u64 = 4096;

const ASPIRATION_DEPTH: usize = 4;
const ASPIRATION_DELTA: i32 = 100;

const NULL_MOVE_DEPTH: usize = 4;
const NULL_MOVE_REDUCTION: usize = 4;

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Lets the owner of a search stop it and follow its progress
pub trait SearchControl {
    /// Polled every few thousand nodes. Returns what should happen to the search, if anything.
    fn poll(&mut self) -> Option<SearchAction>;

    /// Called after each completed iteration
    fn report(&mut self, thinking: &Thinking);
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// A flag which can stop a search from another thread
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Creates a flag which is not set
    pub fn new() -> StopFlag {
        StopFlag::default()
    }

    /// Asks every search polling this flag to stop
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Clears the flag
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    /// Returns `true` if the flag is set
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl SearchControl for StopFlag {
    fn poll(&mut self) -> Option<SearchAction> {
        if self.is_stopped() {
            Some(SearchAction::Stop)
        } else {
            None
        }
    }

    fn report(&mut self, _thinking: &Thinking) { }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Optional parts of the search
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Null move pruning
    pub null_move: bool,
    /// Transposition table cutoffs and hash moves
    pub transposition: bool,
    /// Aspiration windows around the previous iteration's score
    pub aspiration: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig { null_move: true, transposition: true, aspiration: true }
    }
}

/// Returns `true` if `pos` is drawn regardless of what follows
fn is_draw(pos: &Position) -> bool {
    pos.is_fifty_move_draw() || pos.is_repetition() || pos.has_insufficient_material()
}

fn widen(score: Score, delta: i32) -> Score {
    let inf = i32::from(i16::from(Score::infinity()));
    Score::from((i32::from(i16::from(score)) + delta).max(-inf).min(inf) as i16)
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// The search, along with everything it keeps between searches
#[derive(Debug)]
pub struct Search {
    config: SearchConfig,
    tt: HashTable,
    evaluator: Evaluator,
    orderer: MoveOrderer,
    stack: MoveStack,
    root_moves: MoveList,
    pv: Vec<Vec<Move>>,
    best_line: Vec<Move>,

    nodes: u64,
    seldepth: usize,
    start: Instant,
    clock_start: Instant,
    time_limit: Option<Duration>,
    node_limit: Option<u64>,
    infinite: bool,
    pondering: bool,
    stopped: bool,
}

impl Search {
    /// Creates a search with a transposition table of `hash_mb` megabytes, evaluating with
    /// `weights`
    pub fn new(hash_mb: usize, weights: Arc<Weights>) -> Search {
        Search {
            config: SearchConfig::default(),
            tt: HashTable::new(hash_mb),
            evaluator: Evaluator::new(weights),
            orderer: MoveOrderer::new(),
            stack: MoveStack::new(),
            root_moves: MoveList::new(),
            pv: vec![Vec::with_capacity(MAX_PLY); MAX_PLY + 2],
            best_line: Vec::new(),
            nodes: 0,
            seldepth: 0,
            start: Instant::now(),
            clock_start: Instant::now(),
            time_limit: None,
            node_limit: None,
            infinite: false,
            pondering: false,
            stopped: false,
        }
    }

    /// Enables or disables optional parts of the search
    pub fn set_config(&mut self, config: SearchConfig) {
        self.config = config;
    }

    /// Replaces the transposition table with an empty one of `hash_mb` megabytes
    pub fn resize_hash(&mut self, hash_mb: usize) {
        self.tt.resize(hash_mb);
    }

    /// Empties the transposition table
    pub fn clear_hash(&mut self) {
        self.tt.clear();
    }

    /// Forgets everything learned in earlier searches
    pub fn clear(&mut self) {
        self.tt.clear();
        self.orderer.clear();
        self.evaluator.clear();
    }

    /// Evaluates with `weights` from now on
    pub fn set_weights(&mut self, weights: Arc<Weights>) {
        self.evaluator.set_weights(weights);
    }

    /// Searches `pos` for the best move within `limits`. Returns the results of the last
    /// completed iteration; `pos` is unchanged afterwards.
    pub fn run<C: SearchControl>(&mut self, pos: &mut Position, limits: &Limits, control: &mut C)
    -> Thinking {
        self.start = Instant::now();
        self.clock_start = self.start;
        self.nodes = 0;
        self.seldepth = 0;
        self.stopped = false;
        self.infinite = limits.infinite;
        self.pondering = limits.ponder;
        self.node_limit = limits.nodes;
        self.best_line.clear();
        self.tt.new_search();
        self.orderer.clear();

        let turn = pos.turn();
        let game_ply = 2 * (pos.fullmove_number().max(1) as usize - 1)
            + if turn == Color::Black { 1 } else { 0 };
        let allotted = time::allocate(limits, turn, game_ply);
        self.time_limit = limits.movetime.or(allotted);

        pos.generate_legal(&mut self.root_moves);
        if !limits.searchmoves.is_empty() {
            self.root_moves.retain(|mv| limits.searchmoves.contains(&mv));
        }

        let mut thinking = Thinking::new();
        if self.root_moves.is_empty() {
            thinking.score = if pos.in_check() { Score::mated_in(0) } else { Score::draw() };
            self.wait_for_stop(control);
            return thinking;
        }

        let mut max_depth = match limits.depth {
            Some(depth) => depth.max(1),
            None if limits.is_unlimited(turn) => Limits::DEFAULT_DEPTH,
            None => MAX_PLY - 1,
        }.min(MAX_PLY - 1);
        if self.root_moves.len() == 1 && allotted.is_some() {
            max_depth = 1;
        }

        debug!("searching {} to depth {}, time limit {:?}", pos, max_depth, self.time_limit);

        let mut prev = Score::draw();
        for depth in 1..=max_depth {
            let mut delta = ASPIRATION_DELTA;
            let (mut alpha, mut beta) = if self.config.aspiration && depth >= ASPIRATION_DEPTH {
                (widen(prev, -delta), widen(prev, delta))
            } else {
                (-Score::infinity(), Score::infinity())
            };

            let score = loop {
                let score = self.root_search(control, pos, depth, alpha, beta);
                if self.stopped {
                    break score;
                }

                if score <= alpha && alpha > -Score::infinity() {
                    alpha = widen(alpha, -delta);
                } else if score >= beta && beta < Score::infinity() {
                    beta = widen(beta, delta);
                } else {
                    break score;
                }
                delta += delta / 4;
            };

            if self.stopped {
                break;
            }

            prev = score;
            self.best_line = self.pv[0].clone();
            thinking = self.thinking(depth, score);
            control.report(&thinking);

            if score.is_mate() && !self.infinite && !self.pondering {
                break;
            }
            if let Some(limit) = allotted {
                if !self.pondering && !self.infinite && self.clock_start.elapsed() >= limit / 2 {
                    break;
                }
            }
        }

        if !self.stopped {
            self.wait_for_stop(control);
        }

        if thinking.pv.is_empty() {
            // interrupted before the first iteration finished
            let line = if self.pv[0].is_empty() {
                vec![self.root_moves[0]]
            } else {
                self.pv[0].clone()
            };
            thinking = self.thinking(0, Score::draw());
            thinking.pv = line;
        } else {
            thinking.nodes = self.nodes;
            thinking.time = self.start.elapsed();
        }

        debug!("search finished: {} nodes in {:?}", self.nodes, thinking.time);
        thinking
    }

    fn thinking(&self, depth: usize, score: Score) -> Thinking {
        Thinking {
            score,
            depth,
            seldepth: self.seldepth,
            time: self.start.elapsed(),
            nodes: self.nodes,
            pv: self.best_line.clone(),
        }
    }

    /// Infinite and ponder searches may not finish before being told to
    fn wait_for_stop<C: SearchControl>(&mut self, control: &mut C) {
        while self.infinite || self.pondering {
            match control.poll() {
                Some(SearchAction::Stop) | Some(SearchAction::Abort) => break,
                Some(SearchAction::PonderHit) => self.pondering = false,
                None => thread::sleep(Duration::from_millis(5)),
            }
        }
    }

    fn poll<C: SearchControl>(&mut self, control: &mut C) {
        match control.poll() {
            Some(SearchAction::Stop) | Some(SearchAction::Abort) => self.stopped = true,
            Some(SearchAction::PonderHit) => {
                self.pondering = false;
                self.clock_start = Instant::now();
            },
            None => { },
        }

        if !self.pondering && !self.infinite {
            if let Some(limit) = self.time_limit {
                if self.clock_start.elapsed() >= limit {
                    self.stopped = true;
                }
            }
        }
        if let Some(limit) = self.node_limit {
            if self.nodes >= limit {
                self.stopped = true;
            }
        }
    }

    /// Counts a node and checks the limits when it's time to
    fn visit<C: SearchControl>(&mut self, control: &mut C, ply: usize) {
        self.nodes += 1;
        self.seldepth = max(self.seldepth, ply);
        self.pv[ply].clear();

        if self.nodes % POLL_INTERVAL == 0 {
            self.poll(control);
        }
    }

    fn update_pv(&mut self, ply: usize, mv: Move) {
        let (head, tail) = self.pv.split_at_mut(ply + 1);
        let line = &mut head[ply];
        line.clear();
        line.push(mv);
        line.extend_from_slice(&tail[0]);
    }

    fn root_search<C: SearchControl>(&mut self, control: &mut C, pos: &mut Position,
        depth: usize, mut alpha: Score, beta: Score)
    -> Score {
        self.visit(control, 0);

        let depth = if pos.in_check() { depth + 1 } else { depth };
        let hash_move = self.best_line.first().copied();
        self.orderer.score_moves(pos, &mut self.root_moves, hash_move, 0);

        let original_alpha = alpha;
        let mut best_score = -Score::infinity();
        let mut best_move = None;

        for i in 0..self.root_moves.len() {
            let mv = self.root_moves.pick(i);
            let score = self.search_move(control, pos, mv, depth, alpha, beta, 0,
                best_move.is_none());

            if self.stopped {
                return best_score;
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    alpha = score;
                    best_move = Some(mv);
                    self.update_pv(0, mv);
                    if alpha >= beta {
                        break;
                    }
                }
            }
        }

        if self.config.transposition {
            let bound = if best_score >= beta {
                Bound::Lower
            } else if best_score > original_alpha {
                Bound::Exact
            } else {
                Bound::Upper
            };
            let entry = HashEntry::new(pos.zobrist_key(), depth, bound, best_score,
                best_move.or(hash_move));
            self.tt.insert(entry, 0);
        }

        best_score
    }

    /// Searches `mv` from `pos`, which is `ply` plies from the root, returning its score from
    /// the point of view of the side making it. Only the first move searched at a node gets
    /// the full window; the rest are tried with a null window first.
    #[allow(clippy::too_many_arguments)]
    fn search_move<C: SearchControl>(&mut self, control: &mut C, pos: &mut Position, mv: Move,
        depth: usize, alpha: Score, beta: Score, ply: usize, full_window: bool)
    -> Score {
        let info = pos.do_move(mv);
        let score = if full_window {
            -self.search(control, pos, depth - 1, -beta, -alpha, ply + 1, true)
        } else {
            let score = -self.search(control, pos, depth - 1, -alpha - 1, -alpha, ply + 1, true);
            if score > alpha && score < beta && !self.stopped {
                -self.search(control, pos, depth - 1, -beta, -alpha, ply + 1, true)
            } else {
                score
            }
        };
        pos.undo_move(mv, info);
        score
    }

    #[allow(clippy::too_many_arguments)]
    fn search<C: SearchControl>(&mut self, control: &mut C, pos: &mut Position,
        depth: usize, mut alpha: Score, mut beta: Score, ply: usize, allow_null: bool)
    -> Score {
        self.visit(control, ply);
        if self.stopped {
            return Score::draw();
        }
        if ply >= MAX_PLY {
            return self.evaluator.evaluate(pos);
        }
        if is_draw(pos) {
            return Score::draw();
        }

        // no line from here can beat a mate already found closer to the root
        alpha = max(alpha, Score::mated_in(ply));
        beta = min(beta, Score::mates_in(ply + 1));
        if alpha >= beta {
            return alpha;
        }

        let n = pos.generate_legal(&mut self.stack[ply]);
        let in_check = pos.in_check();
        if n == 0 {
            return if in_check { Score::mated_in(ply) } else { Score::draw() };
        }

        let depth = if in_check { depth + 1 } else { depth };
        if depth == 0 {
            return self.quiesce_node(control, pos, alpha, beta, ply);
        }

        let key = pos.zobrist_key();
        let mut hash_move = None;
        if self.config.transposition {
            if let Some(entry) = self.tt.get(key, ply) {
                hash_move = entry.best_move().filter(|&mv| self.stack[ply].contains(mv));
                if entry.depth() >= depth {
                    if let Some(score) = entry.cutoff(alpha, beta) {
                        return score;
                    }
                }
            }
        }

        if self.config.null_move && allow_null && !in_check && depth > NULL_MOVE_DEPTH
            && pos.has_non_pawn_material(pos.turn()) {
            let info = pos.do_null_move();
            let score = -self.search(control, pos, depth - NULL_MOVE_REDUCTION, -beta,
                -beta + 1, ply + 1, false);
            pos.undo_null_move(info);

            if self.stopped {
                return Score::draw();
            }
            if score >= beta {
                return if score.is_mate() { beta } else { score };
            }
        }

        self.orderer.score_moves(pos, &mut self.stack[ply], hash_move, ply);

        let original_alpha = alpha;
        let mut best_score = -Score::infinity();
        let mut best_move = None;

        for i in 0..n {
            let mv = self.stack[ply].pick(i);
            let quiet = ordering::is_quiet(pos, mv);
            let score = self.search_move(control, pos, mv, depth, alpha, beta, ply,
                best_move.is_none());

            if self.stopped {
                return Score::draw();
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    alpha = score;
                    best_move = Some(mv);
                    self.update_pv(ply, mv);
                    if alpha >= beta {
                        if quiet {
                            self.orderer.update(pos.turn(), mv, ply, depth);
                        }
                        break;
                    }
                }
            }
        }

        if self.config.transposition {
            let bound = if best_score >= beta {
                Bound::Lower
            } else if best_score > original_alpha {
                Bound::Exact
            } else {
                Bound::Upper
            };
            self.tt.insert(HashEntry::new(key, depth, bound, best_score, best_move.or(hash_move)),
                ply);
        }

        best_score
    }

    /// Searches captures and promotions only (or every evasion when in check), standing pat on
    /// the static evaluation otherwise
    fn quiesce<C: SearchControl>(&mut self, control: &mut C, pos: &mut Position,
        alpha: Score, beta: Score, ply: usize)
    -> Score {
        self.visit(control, ply);
        self.quiesce_node(control, pos, alpha, beta, ply)
    }

    /// The quiescence search of a node that's already been counted
    fn quiesce_node<C: SearchControl>(&mut self, control: &mut C, pos: &mut Position,
        mut alpha: Score, beta: Score, ply: usize)
    -> Score {
        if self.stopped {
            return Score::draw();
        }
        if is_draw(pos) {
            return Score::draw();
        }
        if ply >= MAX_PLY {
            return self.evaluator.evaluate(pos);
        }

        let in_check = pos.in_check();
        let n = pos.generate_tactical(&mut self.stack[ply]);

        // in check every evasion is generated, so having none is mate
        let mut best_score = if in_check {
            Score::mated_in(ply)
        } else {
            let stand_pat = self.evaluator.evaluate(pos);
            if stand_pat >= beta {
                return stand_pat;
            }
            alpha = max(alpha, stand_pat);
            stand_pat
        };

        self.orderer.score_tactical(pos, &mut self.stack[ply]);

        for i in 0..n {
            let mv = self.stack[ply].pick(i);
            let info = pos.do_move(mv);
            let score = -self.quiesce(control, pos, -beta, -alpha, ply + 1);
            pos.undo_move(mv, info);

            if self.stopped {
                return Score::draw();
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    alpha = score;
                    if alpha >= beta {
                        break;
                    }
                }
            }
        }

        best_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_search() -> Search {
        Search::new(1, Arc::new(Weights::default()))
    }

    fn run(fen: &str, limits: &Limits) -> Thinking {
        let mut pos = Position::from_fen_str(fen).expect("valid");
        new_search().run(&mut pos, limits, &mut StopFlag::new())
    }

    fn minimax(search: &mut Search, pos: &mut Position, depth: usize, ply: usize) -> Score {
        if ply > 0 && is_draw(pos) {
            return Score::draw();
        }

        let mut list = MoveList::new();
        pos.generate_legal(&mut list);
        if list.is_empty() {
            return if pos.in_check() { Score::mated_in(ply) } else { Score::draw() };
        }

        let depth = if pos.in_check() { depth + 1 } else { depth };
        if depth == 0 {
            return search.quiesce(&mut StopFlag::new(), pos, -Score::infinity(),
                Score::infinity(), ply);
        }

        let mut best = -Score::infinity();
        for &mv in list.iter() {
            let info = pos.do_move(mv);
            best = max(best, -minimax(search, pos, depth - 1, ply + 1));
            pos.undo_move(mv, info);
        }
        best
    }

    #[test]
    fn finds_mate_in_one() {
        let thinking = run("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1", &Limits::depth(3));
        assert_eq!(thinking.best_move().map(|mv| mv.to_string()), Some("a1a8".to_string()));
        assert_eq!(thinking.score(), Score::mates_in(1));
        assert_eq!(thinking.score().to_string(), "mate 1");
    }

    #[test]
    fn finds_mate_in_two() {
        // both Kb6 and Kc7 mate next move
        let thinking = run("k7/8/2K5/8/8/8/8/7R w - - 0 1", &Limits::depth(5));
        assert_eq!(thinking.score(), Score::mates_in(3));
        assert_eq!(thinking.score().to_string(), "mate 2");
        let best = thinking.best_move().map(|mv| mv.to_string()).expect("a move");
        assert!(best == "c6b6" || best == "c6c7", "{}", best);
    }

    #[test]
    fn leaf_nodes_are_counted_once() {
        // Kb1 is the only move and Black has no captures after it
        let thinking = run("k7/8/8/8/8/1p6/1P6/K7 w - - 0 1", &Limits::depth(1));
        assert_eq!(thinking.best_move().map(|mv| mv.to_string()), Some("a1b1".to_string()));
        assert_eq!(thinking.nodes(), 2);
    }

    #[test]
    fn scores_mate_and_stalemate_at_the_root() {
        let mated = run("k7/1Q6/1K6/8/8/8/8/8 b - - 0 1", &Limits::depth(3));
        assert_eq!(mated.best_move(), None);
        assert_eq!(mated.score(), Score::mated_in(0));

        let stalemate = run("k7/8/1QK5/8/8/8/8/8 b - - 0 1", &Limits::depth(3));
        assert_eq!(stalemate.best_move(), None);
        assert_eq!(stalemate.score(), Score::draw());
    }

    #[test]
    fn wins_a_hanging_queen() {
        let thinking = run("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1", &Limits::depth(3));
        assert_eq!(thinking.best_move().map(|mv| mv.to_string()), Some("d2d5".to_string()));
        assert!(thinking.score() > Score::from(300));
    }

    #[test]
    fn pruning_matches_minimax() {
        let fens = [
            crate::chess::START_FEN,
            "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
            "4k3/8/8/3q4/8/2N5/3R4/4K3 b - - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        ];

        for fen in fens.iter() {
            let mut pos = Position::from_fen_str(fen).expect("valid");
            let mut search = new_search();
            search.set_config(SearchConfig {
                null_move: false,
                transposition: false,
                aspiration: false,
            });

            let thinking = search.run(&mut pos, &Limits::depth(3), &mut StopFlag::new());
            let expected = minimax(&mut search, &mut pos, 3, 0);
            assert_eq!(thinking.score(), expected, "{}", fen);
        }
    }

    #[test]
    fn full_search_agrees_on_an_easy_tactic() {
        let mut search = new_search();
        let mut pos = Position::from_fen_str("4k3/8/8/3q4/8/2N5/8/4K3 w - - 0 1")
            .expect("valid");
        let before = pos.clone();

        let thinking = search.run(&mut pos, &Limits::depth(6), &mut StopFlag::new());
        assert_eq!(thinking.best_move().map(|mv| mv.to_string()), Some("c3d5".to_string()));
        assert_eq!(thinking.depth(), 6);
        assert_eq!(pos.to_fen_str(), before.to_fen_str());
        assert_eq!(pos.zobrist_key(), before.zobrist_key());
    }

    #[test]
    fn only_searches_the_given_moves() {
        let mut limits = Limits::depth(3);
        let pos = Position::new();
        limits.searchmoves = vec![pos.parse_move("a2a3").expect("legal")];

        let thinking = run(crate::chess::START_FEN, &limits);
        assert_eq!(thinking.best_move().map(|mv| mv.to_string()), Some("a2a3".to_string()));
    }

    #[test]
    fn stopped_search_still_returns_a_legal_move() {
        let mut pos = Position::new();
        let mut flag = StopFlag::new();
        flag.stop();

        let limits = Limits { infinite: true, ..Limits::default() };
        let thinking = new_search().run(&mut pos, &limits, &mut flag);

        let mut legal = MoveList::new();
        pos.generate_legal(&mut legal);
        assert!(legal.contains(thinking.best_move().expect("a move")));
    }

    #[test]
    fn node_limit_is_respected() {
        let limits = Limits { nodes: Some(10_000), ..Limits::default() };
        let thinking = run(crate::chess::START_FEN, &limits);
        assert!(thinking.nodes() < 10_000 + POLL_INTERVAL);
        assert!(thinking.best_move().is_some());
    }

    #[test]
    fn movetime_is_respected() {
        let limits = Limits::movetime(Duration::from_millis(100));
        let thinking = run(crate::chess::START_FEN, &limits);
        assert!(thinking.time() < Duration::from_millis(1_000));
        assert!(thinking.best_move().is_some());
    }

    #[test]
    fn progress_is_reported_every_iteration() {
        struct Recorder(Vec<usize>);

        impl SearchControl for Recorder {
            fn poll(&mut self) -> Option<SearchAction> { None }
            fn report(&mut self, thinking: &Thinking) {
                self.0.push(thinking.depth());
            }
        }

        let mut pos = Position::new();
        let mut recorder = Recorder(Vec::new());
        new_search().run(&mut pos, &Limits::depth(4), &mut recorder);
        assert_eq!(recorder.0, vec![1, 2, 3, 4]);
    }
}
