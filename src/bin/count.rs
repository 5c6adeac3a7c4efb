//! Counts the number of variations from a given starting position to a specified depth. Defaults
//! to the standard starting position.
//
//  Copyright 2019 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::fs::File;
use std::io::BufReader;
use std::io::prelude::*;
use std::process;
use std::time::Instant;
use clap::{Arg, App, crate_version};
use scarecrow::chess::{variations, Position};

fn main() {
    let matches =
        App::new("scarecrow count")
            .version(crate_version!())
            .author("Mike Leany")
            .about("Counts the number of variations from a given starting position \
                    to a specified\ndepth. Defaults to the standard starting position.")
            .arg(Arg::with_name("file")
                .short("f")
                .value_name("EPD_FILE")
                .takes_value(true)
                .conflicts_with("depth")
                .conflicts_with("fen")
                .help("An EPD file of positions to search, with expected counts given as \
                       ;D<depth> <count>"))
            .arg(Arg::with_name("fen")
                .value_name("FEN_STRING")
                .default_value("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
                .hide_default_value(true)
                .multiple(true)
                .help("Position to search in Forsyth-Edwards Notation (FEN)"))
            .arg(Arg::with_name("depth")
                .long("depth")
                .short("d")
                .value_name("DEPTH")
                .takes_value(true)
                .required_unless("file")
                .conflicts_with("file")
                .help("Depth to search the position"))
            .get_matches();

    let result = if let Some(file) = matches.value_of("file") {
        read_epd(file)
    } else {
        count_fens(
            matches.value_of("depth").expect("INFALLIBLE"),
            matches.values_of("fen").expect("INFALLIBLE"),
        )
    };

    if let Err(error) = result {
        eprintln!("error: {}", error);
        process::exit(1);
    }
}

fn count_fens<'a>(depth: &str, fens: impl Iterator<Item = &'a str>) -> Result<(), String> {
    let depth: usize = depth.parse().map_err(|error| format!("\"{}\": {}", depth, error))?;

    for fen in fens {
        let mut pos: Position = fen.parse().map_err(|error| format!("{}: {}", fen, error))?;
        println!("\n{}", fen);
        let start = Instant::now();
        let count = variations::print(&mut pos, depth);
        println!("Depth {} total:\t{:12}\t({} ms)", depth, count, start.elapsed().as_millis());
    }

    Ok(())
}

fn read_epd(file: &str) -> Result<(), String> {
    let epd = BufReader::new(File::open(file).map_err(|error| format!("{}: {}", file, error))?);
    let mut failures = 0;

    for (line_num, line) in epd.lines().enumerate() {
        let line = line.map_err(|error| format!("{}: line {}: {}", file, line_num + 1, error))?;
        match check_epd_line(&line, line_num + 1) {
            Ok(true) => {},
            Ok(false) => failures += 1,
            Err(error) => return Err(format!("{}: line {}: {}", file, line_num + 1, error)),
        }
    }

    if failures > 0 {
        Err(format!("{} position(s) had incorrect counts", failures))
    } else {
        Ok(())
    }
}

/// Returns whether every count on the line was correct.
fn check_epd_line(line: &str, line_num: usize) -> Result<bool, String> {
    let mut fields = line.split(';');
    let fen = match fields.next() {
        Some(fen) if !fen.trim().is_empty() => fen.trim(),
        _ => return Ok(true),
    };
    let mut pos: Position = fen.parse().map_err(|error| format!("{}: {}", fen, error))?;
    let mut correct = true;

    println!("\nLine {:3}:\t{}", line_num, fen);
    for field in fields {
        let nums: Vec<&str> = field.trim().trim_start_matches('D').split_whitespace().collect();
        if nums.len() < 2 {
            return Err(format!("\"{}\": not enough fields", field));
        } else if nums.len() > 2 {
            return Err(format!("\"{}\": too many fields", field));
        }

        let depth: usize = nums[0].parse().map_err(|error| format!("\"{}\": {}", nums[0], error))?;
        let expected: u64 = nums[1].parse()
            .map_err(|error| format!("\"{}\": {}", nums[1], error))?;

        println!("Depth {} expected:\t{:12}", depth, expected);
        let count = variations::count(&mut pos, depth);
        println!("Depth {} result:  \t{:12}", depth, count);
        if count != expected {
            eprintln!("line {}: depth {}: expected {} but counted {}",
                line_num, depth, expected, count);
            correct = false;
        }
    }

    Ok(correct)
}
