//! The scarecrow chess engine.
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
#![warn(missing_docs, missing_debug_implementations, unused_extern_crates)]
#![warn(clippy::unimplemented, clippy::todo)]
#![warn(clippy::option_unwrap_used, clippy::result_unwrap_used)]

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use clap::{App, Arg, SubCommand, crate_version};
use simplelog::{WriteLogger, LevelFilter, Config};
use log::{debug, info};
use scarecrow::chess::{variations, Position};
use scarecrow::engine::{bitbase, Engine, Search};
use scarecrow::engine::weights::Weights;
use scarecrow::protocol::uci::{Uci, HASH_RANGE};

fn main() -> Result<(), Error> {
    let app_dir = dirs::home_dir()
        .map(|home| { home.join(".scarecrow") })
        .unwrap_or_else(|| PathBuf::from("."));

    let matches =
        App::new("Scarecrow")
            .version(crate_version!())
            .author("Mike Leany")
            .about("A UCI chess engine")
            .arg(Arg::with_name("log")
                .long("log")
                .short("l")
                .global(true)
                .help("Turns on logging"))
            .arg(Arg::with_name("log-file")
                .long("log-file")
                .global(true)
                .value_name("LOG_FILE")
                .takes_value(true)
                .default_value("scarecrow.log")
                .help("Sets the log file if logging is turned on"))
            .arg(Arg::with_name("log-level")
                .long("log-level")
                .global(true)
                .value_name("LEVEL")
                .takes_value(true)
                .default_value("info")
                .possible_values(&["off", "error", "warn", "info", "debug", "trace"])
                .help("Sets the log level if logging is turned on"))
            .arg(Arg::with_name("weights")
                .long("weights")
                .short("w")
                .value_name("WEIGHTS_FILE")
                .takes_value(true)
                .help("Loads evaluation weights from a file. Defaults to ~/.scarecrow/weights.bin \
                       if it exists, or the built-in weights otherwise"))
            .arg(Arg::with_name("hash")
                .long("hash")
                .value_name("MEGABYTES")
                .takes_value(true)
                .default_value("16")
                .help("Sets the size of the transposition table"))
            .subcommand(SubCommand::with_name("counts")
                .about("Counts the number of variations from a given starting position \
                        to a specified\ndepth. Defaults to the standard starting position.")
                .arg(Arg::with_name("depth")
                    .long("depth")
                    .short("d")
                    .value_name("DEPTH")
                    .takes_value(true)
                    .required(true)
                    .help("Depth to search the position"))
                .arg(Arg::with_name("fen")
                    .value_name("FEN_STRING")
                    .default_value("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
                    .hide_default_value(true)
                    .multiple(true)
                    .help("Position to search in Forsyth-Edwards Notation (FEN)")))
            .get_matches();

    let log_file = PathBuf::from(matches.value_of_os("log-file").expect("INFALLIBLE"));
    let log_level: LevelFilter = matches
        .value_of("log-level")
        .expect("INFALLIBLE")
        .parse()
        .map_err(|_| Error("invalid log level".to_owned()))?;

    let _logger = if matches.is_present("log") {
        WriteLogger::init(
            log_level,
            Config::default(),
            File::create(&log_file).map_err(|err| {
                Error(format!("{}: {}", log_file.display(), err))
            })?)
    } else {
        WriteLogger::init(LevelFilter::Off, Config::default(), std::io::sink())
    };
    info!("scarecrow {} started {}", crate_version!(), chrono::Local::now().to_rfc2822());

    match matches.subcommand() {
        (_, None) => {
            let hash_mb: usize = matches
                .value_of("hash")
                .expect("INFALLIBLE")
                .parse()
                .map_err(|_| Error("hash size must be numeric".to_owned()))?;
            let hash_mb = hash_mb.max(HASH_RANGE.0).min(HASH_RANGE.1);

            let weights = load_weights(matches.value_of_os("weights").map(PathBuf::from),
                app_dir.join("weights.bin"))?;

            let start = Instant::now();
            bitbase::init();
            debug!("bitbase ready after {} ms", start.elapsed().as_millis());

            let search = Search::new(hash_mb, Arc::new(weights));
            Engine::new(Uci::new(hash_mb), search).run();
        },
        ("counts", Some(matches)) => {
            let depth = matches
                .value_of("depth")
                .expect("INFALLIBLE")
                .parse()
                .map_err(|_| {Error("depth must be numeric".to_owned())})?;

            println!();
            for fen in matches.values_of("fen").expect("INFALLIBLE") {
                let mut pos: Position = fen.parse()
                    .map_err(|err| {Error(format!("{}: {}", fen, err))})?;
                println!("{}", fen);
                let count = variations::print(&mut pos, depth);
                println!("Depth {} total:\t{:12}\n", depth, count);
            }
        },
        _ => unreachable!(),
    }

    Ok(())
}

/// Loads the weights named on the command line, or the default weight file if there is one.
/// A file which exists but can't be used is fatal.
fn load_weights(requested: Option<PathBuf>, default_file: PathBuf) -> Result<Weights, Error> {
    let file = match requested {
        Some(file) => file,
        None if default_file.is_file() => default_file,
        None => {
            info!("using built-in weights");
            return Ok(Weights::default());
        },
    };

    let weights = Weights::load(&file)
        .map_err(|err| Error(format!("{}: {}", file.display(), err)))?;
    info!("loaded weights from {}", file.display());
    Ok(weights)
}

struct Error(String);

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        self.0.fmt(f)
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for Error { }
