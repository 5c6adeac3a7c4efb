//! Time management
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
//! The time for a move is the smallest share of the remaining time over every possible number of
//! moves left in the game (or until the next time control). Each share weighs this move's
//! importance against that of all the moves still to come, so early moves get more time than
//! late ones.
use std::time::Duration;
use crate::chess::Color;
use super::limits::Limits;

const MAX_MOVES_TO_GO: usize = 50;

// never plan to use more of the remaining time than this
const MAX_RATIO: f64 = 0.7;

// clocks plus increments are capped here before being shared out
const MAX_TOTAL: Duration = Duration::from_secs(1 << 32);

/// How much thinking time the move at game ply `ply` deserves, relative to other moves
fn importance(ply: f64) -> f64 {
    (1.0 + ((ply - 64.5) / 6.85).exp()).powf(-0.171).max(0.01)
}

/// The share of `total` to spend at `ply` if the game lasts `moves_to_go` more moves
fn time_for_fixed_length(total: Duration, moves_to_go: usize, ply: usize) -> Duration {
    let this_move = importance(ply as f64);
    let rest: f64 = (1..moves_to_go).map(|i| importance((ply + 2 * i) as f64)).sum();

    total.mul_f64(this_move / (this_move + rest))
}

/// Returns the time to spend on a move by `color` at game ply `ply`, or `None` if the clock of
/// `color` isn't known
pub fn allocate(limits: &Limits, color: Color, ply: usize) -> Option<Duration> {
    let time = limits.time[color as usize]?;
    let inc = limits.inc[color as usize].unwrap_or_default();
    let max_moves_to_go = limits.movestogo
        .filter(|&n| n > 0)
        .map_or(MAX_MOVES_TO_GO, |n| n.min(MAX_MOVES_TO_GO));

    let best = (1..=max_moves_to_go)
        .map(|mtg| {
            let total = inc.checked_mul(mtg as u32 - 1)
                .and_then(|extra| time.checked_add(extra))
                .map_or(MAX_TOTAL, |total| total.min(MAX_TOTAL));
            time_for_fixed_length(total, mtg, ply)
        })
        .min()
        .unwrap_or(time);

    Some(best.min(time.mul_f64(MAX_RATIO)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(time_ms: u64, inc_ms: u64, movestogo: Option<usize>) -> Limits {
        Limits {
            time: [Some(Duration::from_millis(time_ms)), None],
            inc: [Some(Duration::from_millis(inc_ms)), None],
            movestogo,
            ..Limits::default()
        }
    }

    #[test]
    fn importance_falls_late_in_the_game() {
        assert!(importance(0.0) > importance(80.0));
        assert!(importance(80.0) > importance(120.0));
        assert!(importance(1000.0) >= 0.01);
    }

    #[test]
    fn unknown_clock_has_no_allocation() {
        assert_eq!(allocate(&limits(1000, 0, None), Color::Black, 0), None);
    }

    #[test]
    fn last_move_before_time_control_uses_most_of_the_clock() {
        let time = allocate(&limits(10_000, 0, Some(1)), Color::White, 20).expect("timed");
        assert!(time > Duration::from_millis(6_999));
        assert!(time <= Duration::from_millis(7_000));
    }

    #[test]
    fn sudden_death_uses_a_small_share() {
        let time = allocate(&limits(60_000, 0, None), Color::White, 0).expect("timed");
        assert!(time > Duration::from_millis(500));
        assert!(time < Duration::from_millis(3_000));
    }

    #[test]
    fn increment_adds_time() {
        let without = allocate(&limits(60_000, 0, None), Color::White, 30).expect("timed");
        let with = allocate(&limits(60_000, 1_000, None), Color::White, 30).expect("timed");
        assert!(with > without);
    }

    #[test]
    fn huge_increment_is_capped_by_the_clock() {
        let time = allocate(&limits(60_000, u64::MAX / 2, None), Color::White, 10).expect("timed");
        assert!(time <= Duration::from_millis(42_000));
        assert!(time > Duration::from_millis(41_000));

        let time = allocate(&limits(60_000, 1_000, Some(usize::MAX)), Color::White, 10)
            .expect("timed");
        assert!(time < Duration::from_millis(42_000));
    }

    #[test]
    fn fewer_moves_to_go_gets_more_time() {
        let many = allocate(&limits(60_000, 0, Some(40)), Color::White, 10).expect("timed");
        let few = allocate(&limits(60_000, 0, Some(5)), Color::White, 10).expect("timed");
        assert!(few > many);
    }
}
