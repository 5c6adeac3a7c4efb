//! The Transposition Table
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::mem::size_of;
use crate::chess::{Move, Zobrist, MAX_PLY};
use crate::engine::Score;

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Indicates the kind of bound a transposition table has.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Bound {
    /// The real score is at least the stored score
    Lower,
    /// The stored score is exact
    Exact,
    /// The real score is at most the stored score
    Upper,
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// An entry in the transposition table.
///
/// It is guaranteed to be exactly 16 bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HashEntry {
    // 8 bytes
    zobrist: Zobrist,
    // 2 bytes
    when: u16,
    // 1 bytes
    depth: u8,
    // 1 byte
    bound: Bound,
    // 2 bytes
    score: Score,
    // 2 bytes
    best_move: Option<Move>,
}

impl HashEntry {
    /// Creates an entry for the position with key `zobrist`, searched to `depth`
    pub fn new(
        zobrist: Zobrist,
        depth: usize,
        bound: Bound, score: Score,
        best_move: Option<Move>)
    -> HashEntry {
        HashEntry {
            zobrist,
            when: 0,
            depth: depth.min(u8::max_value() as usize) as u8,
            bound,
            score,
            best_move,
        }
    }

    pub fn zobrist(&self) -> Zobrist {
        self.zobrist
    }

    pub fn depth(&self) -> usize {
        self.depth as usize
    }

    pub fn bound(&self) -> Bound {
        self.bound
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn best_move(&self) -> Option<Move> {
        self.best_move
    }

    /// Returns the score if it settles the window `alpha..beta`
    pub fn cutoff(&self, alpha: Score, beta: Score) -> Option<Score> {
        match self.bound {
            Bound::Exact => Some(self.score),
            Bound::Lower if self.score >= beta => Some(self.score),
            Bound::Upper if self.score <= alpha => Some(self.score),
            _ => None,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// A transposition table
#[derive(Debug)]
pub struct HashTable {
    buckets: Vec<BucketList>,
    now: u16,
}
type BucketList = [Option<HashEntry>; HashTable::BUCKETS];

impl HashTable {
    const BUCKETS: usize = 4;

    /// Creates a table using at most `megabytes` of memory, and at least one bucket list
    pub fn new(megabytes: usize) -> HashTable {
        let mut table = HashTable { buckets: Vec::new(), now: 0 };
        table.resize(megabytes);
        table
    }

    /// Changes the size of the table, discarding every entry
    pub fn resize(&mut self, megabytes: usize) {
        let lists = (megabytes * 1024 * 1024 / size_of::<BucketList>()).max(1);
        let lists = if lists.is_power_of_two() { lists } else { lists.next_power_of_two() / 2 };

        self.buckets = vec![[None; Self::BUCKETS]; lists];
        self.now = 0;
    }

    /// Returns the number of entries the table can hold
    pub fn capacity(&self) -> usize {
        self.buckets.len() * Self::BUCKETS
    }

    /// Marks the start of a new search, so that entries from earlier searches are replaced first
    pub fn new_search(&mut self) {
        self.now = self.now.wrapping_add(1);
    }

    fn index(&self, zobrist: Zobrist) -> usize {
        u64::from(zobrist) as usize & (self.buckets.len() - 1)
    }

    /// Looks up the position with key `zobrist`, found `ply` plies from the root
    pub fn get(&self, zobrist: Zobrist, cur_ply: usize) -> Option<HashEntry> {
        let index = self.index(zobrist);

        for bucket in 0..Self::BUCKETS {
            match self.buckets[index][bucket] {
                Some(mut entry) if zobrist == entry.zobrist => {
                    // stored mate scores count from the node, not the root
                    if entry.score >= Score::mates_in(MAX_PLY) {
                        entry.score = entry.score - cur_ply as i16;
                    } else if entry.score <= Score::mated_in(MAX_PLY) {
                        entry.score = entry.score + cur_ply as i16;
                    }

                    return Some(entry);
                },
                _ => { },
            }
        }

        None
    }

    /// Stores `new_entry` for a position found `ply` plies from the root
    pub fn insert(&mut self, mut new_entry: HashEntry, cur_ply: usize) {
        let index = self.index(new_entry.zobrist);

        if new_entry.score >= Score::mates_in(MAX_PLY) {
            new_entry.score = new_entry.score + cur_ply as i16;
        } else if new_entry.score <= Score::mated_in(MAX_PLY) {
            new_entry.score = new_entry.score - cur_ply as i16;
        }
        new_entry.when = self.now;

        let list = &mut self.buckets[index];
        let same = list.iter().position(|e| e.map_or(false, |e| e.zobrist == new_entry.zobrist));
        let empty = list.iter().position(Option::is_none);
        let now = self.now;
        let bucket = same.or(empty).unwrap_or_else(|| {
            // the shallowest entry, counting each search of age as one ply
            (0..Self::BUCKETS)
                .min_by_key(|&b| list[b].map_or(0, |e| {
                    e.depth as i32 - i32::from(now.wrapping_sub(e.when))
                }))
                .unwrap_or(0)
        });

        list[bucket] = Some(new_entry);
    }

    /// Removes every entry
    pub fn clear(&mut self) {
        for list in self.buckets.iter_mut() {
            *list = [None; Self::BUCKETS];
        }
        self.now = 0;
    }
}


////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod test {
    use super::*;
    use crate::chess::Square;

    fn key(n: u64) -> Zobrist {
        let mut z = Zobrist::new();
        // keys only need to differ, not to come from a position
        for (i, sq) in Square::all().enumerate() {
            if n & 1 << i != 0 {
                z.toggle_piece(crate::chess::Color::White, crate::chess::Piece::Pawn, sq);
            }
        }
        z
    }

    #[test]
    fn hash_entry_size() {
        assert_eq!(size_of::<Option<HashEntry>>(), 16);
    }

    #[test]
    fn size_is_a_power_of_two() {
        let table = HashTable::new(3);
        assert!(table.buckets.len().is_power_of_two());
        assert!(table.capacity() * 16 <= 3 * 1024 * 1024);
        assert_eq!(HashTable::new(0).capacity(), HashTable::BUCKETS);
    }

    #[test]
    fn stored_entries_are_found() {
        let mut table = HashTable::new(1);
        let mv = Move::new(Square::E2, Square::E4);
        table.insert(HashEntry::new(key(5), 3, Bound::Lower, Score::from(25), Some(mv)), 0);

        let entry = table.get(key(5), 0).expect("stored");
        assert_eq!(entry.best_move(), Some(mv));
        assert_eq!(entry.depth(), 3);
        assert_eq!(entry.score(), Score::from(25));
        assert_eq!(entry.cutoff(Score::from(0), Score::from(20)), Some(Score::from(25)));
        assert_eq!(entry.cutoff(Score::from(0), Score::from(30)), None);
        assert_eq!(table.get(key(6), 0), None);

        table.clear();
        assert_eq!(table.get(key(5), 0), None);
    }

    #[test]
    fn mate_scores_are_relative_to_the_node() {
        let mut table = HashTable::new(1);
        // mate found 7 plies from the root, stored at ply 3
        table.insert(HashEntry::new(key(9), 4, Bound::Exact, Score::mates_in(7), None), 3);
        // reached again at ply 5: mate is still 4 plies away
        assert_eq!(table.get(key(9), 5).expect("stored").score(), Score::mates_in(9));

        table.insert(HashEntry::new(key(10), 4, Bound::Exact, Score::mated_in(6), None), 2);
        assert_eq!(table.get(key(10), 0).expect("stored").score(), Score::mated_in(4));
    }

    #[test]
    fn shallow_entries_are_replaced_first() {
        let mut table = HashTable::new(0);
        for (n, depth) in [(1, 5), (2, 1), (3, 7), (4, 6)].iter() {
            table.insert(HashEntry::new(key(*n), *depth, Bound::Exact, Score::draw(), None), 0);
        }
        table.insert(HashEntry::new(key(8), 2, Bound::Exact, Score::draw(), None), 0);

        assert!(table.get(key(2), 0).is_none());
        for n in [1, 3, 4, 8].iter() {
            assert!(table.get(key(*n), 0).is_some());
        }

        // replacing the same position keeps one copy
        table.insert(HashEntry::new(key(8), 9, Bound::Lower, Score::draw(), None), 0);
        assert_eq!(table.get(key(8), 0).expect("stored").depth(), 9);
        assert!(table.get(key(1), 0).is_some());
    }
}
