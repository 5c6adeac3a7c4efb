//! Implements the [Universal Chess Interface](http://wbec-ridderkerk.nl/html/UCIProtocol.html)
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use std::sync::Arc;
use std::collections::VecDeque;
use std::num::ParseIntError;
use std::sync::mpsc::TryRecvError;
use log::{debug, info, warn, error};
use lazy_static::lazy_static;
use regex::{RegexSet, Regex};
use super::{Protocol, Request, SearchAction, io};
use crate::chess::{variations, Color, Position};
use crate::engine::{Limits, Score, Thinking};
use crate::engine::weights::Weights;

const NAME: &str = "Scarecrow";
const AUTHOR: &str = "Mike Leany";

/// Smallest and largest transposition table sizes, in megabytes
pub const HASH_RANGE: (usize, usize) = (1, 1024);

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Implementation of the UCI protocol
#[derive(Debug)]
pub struct Uci {
    client: io::Client,

    position: Position,
    limits: Limits,
    hash_mb: usize,

    // commands received during a search, handled once it ends
    pending: VecDeque<String>,
    quitting: bool,
}

impl Uci {
    /// Starts the UCI interface, reading from stdin. `hash_mb` is the transposition table size
    /// reported as the default for the `Hash` option.
    pub fn new(hash_mb: usize) -> Self {
        Self::with_client(io::Client::connect(), hash_mb)
    }

    /// Starts the UCI interface, reading from `client`.
    pub fn with_client(client: io::Client, hash_mb: usize) -> Self {
        Uci {
            client,
            position: Position::new(),
            limits: Limits::default(),
            hash_mb,
            pending: VecDeque::new(),
            quitting: false,
        }
    }

    /// Handles a command received while not searching
    fn handle(&mut self, line: &str) -> Option<Request> {
        use Command::*;

        let cmd: Command = match line.parse() {
            Ok(cmd) => cmd,
            Err(_) => {
                if !line.is_empty() {
                    warn!("unknown or incorrectly formatted command: {}", line);
                }
                return None;
            },
        };

        match cmd {
            Command::Uci => {
                Response::Id(NAME.to_string() + " " + env!("CARGO_PKG_VERSION"), AUTHOR.to_string())
                    .send();
                Response::Declare(UciOption::Spin {
                    name: "Hash".to_string(),
                    default: self.hash_mb as i64,
                    min: HASH_RANGE.0 as i64,
                    max: HASH_RANGE.1 as i64,
                }).send();
                Response::Declare(UciOption::Button{ name: "Clear Hash".to_string() }).send();
                Response::Declare(UciOption::String {
                    name: "Weights".to_string(),
                    default: String::new(),
                }).send();
                Response::UciOk.send();
            },
            IsReady => Response::ReadyOk.send(),
            SetOption{ name, value } => return self.set_option(&name, value.as_deref()),
            UciNewGame => {
                self.position = Position::new();
                return Some(Request::NewGame);
            },
            SetPosition{ fen, moves } => self.set_position(fen.as_deref(), &moves),
            Go{ limits, searchmoves } => {
                self.limits = limits;
                for s in searchmoves.iter() {
                    match self.position.parse_move(s) {
                        Ok(mv) => self.limits.searchmoves.push(mv),
                        Err(err) => warn!("ignoring searchmove {}: {}", s, err),
                    }
                }
                return Some(Request::Search);
            },
            Stop | PonderHit => debug!("not searching: {}", line),
            Quit => {
                self.quitting = true;
                return Some(Request::Quit);
            },
            Display => {
                Response::InfoString(format!("fen {}", self.position)).send();
                Response::InfoString(format!("key {:016x}", self.position.zobrist_key())).send();
            },
            Perft(depth) => {
                let mut pos = self.position.clone();
                let mut total = 0;
                for (mv, count) in variations::divide(&mut pos, depth) {
                    io::Client::send(&format!("{}: {}", mv, count));
                    total += count;
                }
                io::Client::send(&format!("nodes {}", total));
            },
        }

        None
    }

    fn set_option(&mut self, name: &str, value: Option<&str>) -> Option<Request> {
        match (name.to_lowercase().as_str(), value) {
            ("hash", Some(value)) => match value.trim().parse::<usize>() {
                Ok(mb) => {
                    self.hash_mb = mb.max(HASH_RANGE.0).min(HASH_RANGE.1);
                    Some(Request::SetHash(self.hash_mb))
                },
                Err(err) => {
                    warn!("invalid hash size {}: {}", value, err);
                    None
                },
            },
            ("clear hash", _) => Some(Request::ClearHash),
            ("weights", Some(path)) => match Weights::load(path.trim()) {
                Ok(weights) => {
                    info!("loaded weights from {}", path);
                    Some(Request::SetWeights(Arc::new(weights)))
                },
                Err(err) => {
                    error!("cannot load weights from {}: {}", path, err);
                    Response::InfoString(format!("cannot load weights: {}", err)).send();
                    None
                },
            },
            _ => {
                warn!("unknown option or missing value: {}", name);
                None
            },
        }
    }

    fn set_position(&mut self, fen: Option<&str>, moves: &[String]) {
        let mut pos = match fen {
            None => Position::new(),
            Some(fen) => match Position::from_fen_str(fen) {
                Ok(pos) => pos,
                Err(err) => {
                    warn!("invalid position {}: {}", fen, err);
                    Response::InfoString(format!("invalid position: {}", err)).send();
                    return;
                },
            },
        };

        for s in moves {
            match pos.parse_move(s) {
                Ok(mv) => {
                    pos.do_move(mv);
                },
                Err(err) => {
                    warn!("illegal move {} from {}: {}", s, pos, err);
                    break;
                },
            }
        }

        self.position = pos;
    }
}

impl Protocol for Uci {
    fn next_request(&mut self) -> Request {
        loop {
            if self.quitting {
                return Request::Quit;
            }

            let line = match self.pending.pop_front() {
                Some(line) => line,
                None => match self.client.recv() {
                    Ok(line) => line,
                    Err(_) => {
                        info!("input closed");
                        return Request::Quit;
                    },
                },
            };

            if let Some(request) = self.handle(&line) {
                return request;
            }
        }
    }

    fn send_move(&mut self, thinking: &Thinking) {
        Response::BestMove {
            best: thinking.best_move().map(|mv| mv.to_string()),
            ponder: thinking.ponder_move().map(|mv| mv.to_string()),
        }.send();
    }

    fn send_thinking(&mut self, thinking: &Thinking) {
        let pv: Vec<String> = thinking.pv().iter().map(|mv| mv.to_string()).collect();

        Response::Info {
            depth: thinking.depth(),
            seldepth: thinking.seldepth(),
            score: thinking.score(),
            nodes: thinking.nodes(),
            nps: thinking.nps(),
            time: thinking.time(),
            pv: pv.join(" "),
        }.send();
    }

    fn check_input(&mut self) -> Option<SearchAction> {
        use Command::*;

        match self.client.try_recv() {
            Ok(line) => match line.parse::<Command>() {
                Ok(Stop) => return Some(SearchAction::Stop),
                Ok(PonderHit) => return Some(SearchAction::PonderHit),
                Ok(IsReady) => Response::ReadyOk.send(),
                Ok(Quit) => {
                    self.quitting = true;
                    return Some(SearchAction::Abort);
                },
                Ok(_) => self.pending.push_back(line),
                Err(_) => warn!("unknown or incorrectly formatted command: {}", line),
            },
            Err(TryRecvError::Disconnected) => {
                if !self.quitting {
                    info!("input closed during search");
                    self.quitting = true;
                }
                // nothing else can end these searches
                if self.limits.infinite || self.limits.ponder {
                    return Some(SearchAction::Stop);
                }
            },
            Err(TryRecvError::Empty) => { },
        }

        None
    }

    fn position(&self) -> &Position {
        &self.position
    }

    fn limits(&self) -> &Limits {
        &self.limits
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Commands which can be sent to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Tells the engine to use UCI.
    ///
    /// ```text
    /// uci
    /// ```
    Uci,

    /// Asks the engine to respond with `readyok` once it has processed all earlier input.
    ///
    /// ```text
    /// isready
    /// ```
    IsReady,

    /// Changes an option.
    ///
    /// ```text
    /// setoption name <id> [value <x>]
    /// ```
    SetOption{
        /// The option's name, which may contain spaces
        name: String,
        /// The new value, absent for buttons
        value: Option<String>,
    },

    /// The next search will be from a different game.
    ///
    /// ```text
    /// ucinewgame
    /// ```
    UciNewGame,

    /// Sets up the position to search.
    ///
    /// ```text
    /// position [fen <fenstring> | startpos] [moves <move1> ... <movei>]
    /// ```
    SetPosition{
        /// The starting position, or `None` for the standard start position
        fen: Option<String>,
        /// Moves played from the starting position
        moves: Vec<String>,
    },

    /// Starts a search.
    ///
    /// ```text
    /// go [searchmoves <move1> ... <movei>] [ponder] [wtime <x>] [btime <x>] [winc <x>]
    ///    [binc <x>] [movestogo <x>] [depth <x>] [nodes <x>] [movetime <x>] [infinite]
    /// ```
    Go{
        /// Every limit besides `searchmoves`
        limits: Limits,
        /// Moves to restrict the search to, which can only be checked against a position
        searchmoves: Vec<String>,
    },

    /// Stops searching as soon as possible.
    ///
    /// ```text
    /// stop
    /// ```
    Stop,

    /// The opponent played the move the engine is pondering on.
    ///
    /// ```text
    /// ponderhit
    /// ```
    PonderHit,

    /// Tells the engine to exit.
    ///
    /// ```text
    /// quit
    /// ```
    Quit,

    /// Prints the current position (not part of UCI).
    ///
    /// ```text
    /// d
    /// ```
    Display,

    /// Counts the variations of each move from the current position (not part of UCI).
    ///
    /// ```text
    /// perft <depth>
    /// ```
    Perft(usize),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Command::*;

        match self {
            Command::Uci => "uci".fmt(f),
            IsReady => "isready".fmt(f),
            SetOption{ name, value: Some(value) } =>
                format!("setoption name {} value {}", name, value).fmt(f),
            SetOption{ name, value: None } => format!("setoption name {}", name).fmt(f),
            UciNewGame => "ucinewgame".fmt(f),
            SetPosition{ fen, moves } => {
                let mut s = match fen {
                    Some(fen) => format!("position fen {}", fen),
                    None => "position startpos".to_string(),
                };
                if !moves.is_empty() {
                    s += &format!(" moves {}", moves.join(" "));
                }
                s.fmt(f)
            },
            Go{ limits, searchmoves } => {
                let mut s = "go".to_string();
                if !searchmoves.is_empty() {
                    s += &format!(" searchmoves {}", searchmoves.join(" "));
                }
                if limits.ponder {
                    s += " ponder";
                }
                let times = [
                    ("wtime", limits.time[Color::White as usize]),
                    ("btime", limits.time[Color::Black as usize]),
                    ("winc", limits.inc[Color::White as usize]),
                    ("binc", limits.inc[Color::Black as usize]),
                ];
                for (name, time) in times.iter() {
                    if let Some(time) = time {
                        s += &format!(" {} {}", name, time.as_millis());
                    }
                }
                if let Some(n) = limits.movestogo {
                    s += &format!(" movestogo {}", n);
                }
                if let Some(n) = limits.depth {
                    s += &format!(" depth {}", n);
                }
                if let Some(n) = limits.nodes {
                    s += &format!(" nodes {}", n);
                }
                if let Some(time) = limits.movetime {
                    s += &format!(" movetime {}", time.as_millis());
                }
                if limits.infinite {
                    s += " infinite";
                }
                s.fmt(f)
            },
            Stop => "stop".fmt(f),
            PonderHit => "ponderhit".fmt(f),
            Quit => "quit".fmt(f),
            Display => "d".fmt(f),
            Perft(depth) => format!("perft {}", depth).fmt(f),
        }
    }
}

impl FromStr for Command {
    type Err = UciError;

    fn from_str(s: &str) -> Result<Self, UciError> {
        use Command::*;

        let s = s.trim();
        if let Some(ind) = COMMAND_SET.matches(s).iter().next() {
            let args = COMMAND_VEC[ind].captures(s).expect("INFALLIBLE");

            match ind {
                0 => Ok(Command::Uci),
                1 => Ok(IsReady),
                2 => {
                    let name = args.get(1).expect("INFALLIBLE").as_str().to_string();
                    let value = args.get(2).map(|value| value.as_str().to_string());
                    Ok(SetOption{ name, value })
                },
                3 => Ok(UciNewGame),
                4 => {
                    let fen = args.get(1).map(|fen| fen.as_str().to_string());
                    let moves = args.get(2)
                        .map_or(Vec::new(), |m| m.as_str().split_whitespace()
                            .map(str::to_string)
                            .collect());
                    Ok(SetPosition{ fen, moves })
                },
                5 => parse_go(args.get(1).map_or("", |m| m.as_str())),
                6 => Ok(Stop),
                7 => Ok(PonderHit),
                8 => Ok(Quit),
                9 => Ok(Display),
                10 => Ok(Perft(args.get(1).expect("INFALLIBLE").as_str().parse()?)),
                _ => unreachable!(),
            }
        } else {
            Err(UciError)
        }
    }
}

fn parse_go(args: &str) -> Result<Command, UciError> {
    fn millis(token: Option<&str>) -> Result<Duration, UciError> {
        // some interfaces send negative times once the clock runs out
        let ms: i64 = token.ok_or(UciError)?.parse()?;
        Ok(Duration::from_millis(ms.max(0) as u64))
    }

    fn number<T: FromStr<Err = ParseIntError>>(token: Option<&str>) -> Result<T, UciError> {
        Ok(token.ok_or(UciError)?.parse()?)
    }

    let mut limits = Limits::default();
    let mut searchmoves = Vec::new();
    let mut tokens = args.split_whitespace().peekable();

    while let Some(token) = tokens.next() {
        match token {
            "searchmoves" => {
                while let Some(mv) = tokens.peek() {
                    if !MOVE.is_match(mv) {
                        break;
                    }
                    searchmoves.push(mv.to_string());
                    tokens.next();
                }
            },
            "ponder" => limits.ponder = true,
            "wtime" => limits.time[Color::White as usize] = Some(millis(tokens.next())?),
            "btime" => limits.time[Color::Black as usize] = Some(millis(tokens.next())?),
            "winc" => limits.inc[Color::White as usize] = Some(millis(tokens.next())?),
            "binc" => limits.inc[Color::Black as usize] = Some(millis(tokens.next())?),
            "movestogo" => limits.movestogo = Some(number(tokens.next())?),
            "depth" => limits.depth = Some(number(tokens.next())?),
            "nodes" => limits.nodes = Some(number(tokens.next())?),
            "movetime" => limits.movetime = Some(millis(tokens.next())?),
            "infinite" => limits.infinite = true,
            _ => return Err(UciError),
        }
    }

    Ok(Command::Go{ limits, searchmoves })
}

const COMMANDS: [&str; 11] = [
    r"^uci$",
    r"^isready$",
    r"^setoption\s+name\s+(.+?)(?:\s+value\s+(.*?))?$",
    r"^ucinewgame$",
    r"^position\s+(?:startpos|fen\s+(.+?))(?:\s+moves((?:\s+\S+)*))?$",
    r"^go\b(.*)$",
    r"^stop$",
    r"^ponderhit$",
    r"^quit$",
    r"^d$",
    r"^perft\s+(\d+)$",
];

lazy_static! {
    static ref COMMAND_SET: RegexSet = RegexSet::new(&COMMANDS).expect("INFALLIBLE");
    static ref COMMAND_VEC: Vec<Regex> = {
        let mut cmd_vec = Vec::new();
        for cmd in &COMMANDS {
            cmd_vec.push(Regex::new(cmd).expect("INFALLIBLE"));
        }
        cmd_vec
    };
    static ref MOVE: Regex = Regex::new(r"^[a-h][1-8][a-h][1-8][qrbn]?$").expect("INFALLIBLE");
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// An option the engine supports, as announced in response to `uci`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciOption {
    /// An integer within a range
    Spin{ name: String, default: i64, min: i64, max: i64 },
    /// An action without a value
    Button{ name: String },
    /// A text value
    String{ name: String, default: String },
}

impl fmt::Display for UciOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UciOption::Spin{ name, default, min, max } =>
                format!("option name {} type spin default {} min {} max {}",
                    name, default, min, max).fmt(f),
            UciOption::Button{ name } => format!("option name {} type button", name).fmt(f),
            UciOption::String{ name, default } => {
                let default = if default.is_empty() { "<empty>" } else { default };
                format!("option name {} type string default {}", name, default).fmt(f)
            },
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Responses from the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Identifies the engine and its author, in response to `uci`.
    ///
    /// ```text
    /// id name <name>
    /// id author <author>
    /// ```
    Id(String, String),

    /// Announces a supported option, in response to `uci`.
    ///
    /// ```text
    /// option name <id> type <t> [default <x>] [min <x>] [max <x>]
    /// ```
    Declare(UciOption),

    /// Sent after the id and options, in response to `uci`.
    ///
    /// ```text
    /// uciok
    /// ```
    UciOk,

    /// Response to `isready`.
    ///
    /// ```text
    /// readyok
    /// ```
    ReadyOk,

    /// The engine's move, with the move it expects in reply. `0000` if there is no legal move.
    ///
    /// ```text
    /// bestmove <move> [ponder <move>]
    /// ```
    BestMove{
        /// The move to play
        best: Option<String>,
        /// The reply to ponder on
        ponder: Option<String>,
    },

    /// The engine's current line of thinking.
    ///
    /// ```text
    /// info depth <x> seldepth <x> score <cp x | mate y> nodes <x> nps <x> time <x> pv <moves>
    /// ```
    Info{
        /// Depth of the last completed iteration
        depth: usize,
        /// Greatest depth reached by any line
        seldepth: usize,
        /// Score of the principle variation
        score: Score,
        /// Nodes searched
        nodes: u64,
        /// Nodes searched per second
        nps: u64,
        /// Time spent searching
        time: Duration,
        /// The principle variation
        pv: String,
    },

    /// Text for the user.
    ///
    /// ```text
    /// info string <text>
    /// ```
    InfoString(String),
}

impl Response {
    fn send(&self) {
        io::Client::send(&self.to_string());
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Response::*;

        match self {
            Id(name, author) => format!("id name {}\nid author {}", name, author).fmt(f),
            Declare(option) => option.fmt(f),
            UciOk => "uciok".fmt(f),
            ReadyOk => "readyok".fmt(f),
            BestMove{ best: Some(best), ponder: Some(ponder) } =>
                format!("bestmove {} ponder {}", best, ponder).fmt(f),
            BestMove{ best: Some(best), ponder: None } => format!("bestmove {}", best).fmt(f),
            BestMove{ best: None, .. } => "bestmove 0000".fmt(f),
            Info{ depth, seldepth, score, nodes, nps, time, pv } =>
                format!("info depth {} seldepth {} score {} nodes {} nps {} time {} pv {}",
                    depth, seldepth, score, nodes, nps, time.as_millis(), pv).fmt(f),
            InfoString(s) => format!("info string {}", s).fmt(f),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Error type for UCI
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UciError;

impl From<ParseIntError> for UciError {
    fn from(_: ParseIntError) -> UciError {
        UciError
    }
}
