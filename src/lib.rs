//! Polyhex Packing Search Library
//!
//! Finds maximum-coverage packings of a polyhex piece catalog on a finite
//! hexagonal board and enumerates every distinct best covering. The search
//! runs as independent backtracking workers over a static split of the most
//! constrained piece's placements, with results merged and canonically
//! deduplicated by an aggregator.

pub mod board;
pub mod engine;
pub mod geometry;
pub mod persistence;
pub mod pieces;
pub mod placement;
mod solver;

pub use engine::{solve, spawn_search, RunSummary, SearchEvent, SearchHandle, SolveOptions};
pub use pieces::{Piece, PlacedPiece, Solution};
