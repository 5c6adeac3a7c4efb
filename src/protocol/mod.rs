//! Supported chess protocols
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::sync::Arc;
use crate::chess::Position;
use crate::engine::{Limits, Thinking};
use crate::engine::weights::Weights;

////////////////////////////////////////////////////////////////////////////////////////////////////
/// An action that should be taken regarding the current search.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SearchAction {
    /// The ponder move was played. The engine should leave ponder mode and continue thinking until
    /// it's ready to make a move.
    PonderHit,

    /// The engine should stop thinking and call
    /// [send_move](trait.Protocol.html#tymethod.send_move).
    Stop,

    /// The engine should stop thinking, but should *not* call
    /// [send_move](trait.Protocol.html#tymethod.send_move).
    Abort,
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Something the client wants the engine to do while it isn't searching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Search the protocol's current position within its current limits.
    Search,

    /// A new game is starting; anything learned from earlier searches should be forgotten.
    NewGame,

    /// Empty the transposition table.
    ClearHash,

    /// Resize the transposition table to the given number of megabytes.
    SetHash(usize),

    /// Evaluate with the given weights from now on.
    SetWeights(Arc<Weights>),

    /// Exit.
    Quit,
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Trait used for structures that implement the engine side of a chess protocol
pub trait Protocol {
    /// Handles input until there is something for the engine to do, and returns it.
    fn next_request(&mut self) -> Request where Self: Sized;

    /// Sends the engine's move to the client.
    fn send_move(&mut self, thinking: &Thinking);

    /// If supported by the protocol, send the engine's thinking to the client.
    fn send_thinking(&mut self, thinking: &Thinking);

    /// Allows the protocol to check the input during a search.
    ///
    /// If the search should end for any reason, returns how it should end. Returns PonderHit if
    /// the ponder move was made by the client.
    fn check_input(&mut self) -> Option<SearchAction> where Self: Sized;

    /// Returns the position to search.
    fn position(&self) -> &Position;

    /// Returns the limits of the next search.
    fn limits(&self) -> &Limits;
}

pub mod io;
pub mod uci;
