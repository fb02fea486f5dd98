//! Placement compilation.
//!
//! Enumerates every legal placement of every piece (piece x distinct rotation
//! x anchor cell) up front and packs them into flat, index-addressable
//! tables: one record array grouped contiguously by piece, plus one shared
//! target-cell array. The search loops address placements purely by dense
//! index and never touch coordinates.

use std::ops::Range;

use crate::board::Board;
use crate::geometry::distinct_rotations;
use crate::pieces::{Piece, MAX_PIECES};

/// Pre-computed placement data for one piece at one rotation and anchor.
#[derive(Clone, Copy, Debug)]
pub struct PlacementRecord {
    /// Index of the piece in the catalog.
    pub piece: u16,
    /// The piece's caller-assigned id.
    pub piece_id: u32,
    /// Dense index of the anchor cell.
    pub anchor: u16,
    /// Rotation step applied to the piece offsets.
    pub rotation: u8,
    targets_start: u32,
    targets_len: u8,
}

/// Flat table of every legal placement on one board.
pub struct PlacementTable {
    records: Vec<PlacementRecord>,
    /// Per piece: (start, count) into `records`.
    piece_ranges: Vec<(u32, u32)>,
    /// Shared target-cell array; each record slices into it.
    targets: Vec<u16>,
}

impl PlacementTable {
    /// Compiles all legal placements of a catalog on a board.
    ///
    /// A placement is legal iff every rotated-and-translated cell lies on the
    /// board. A piece that fits nowhere simply gets an empty range; that is a
    /// valid outcome, not an error. With `rotations` false only rotation step
    /// 0 is compiled.
    pub fn compile(board: &Board, catalog: &[Piece], rotations: bool) -> Self {
        assert!(catalog.len() <= MAX_PIECES, "catalog exceeds {MAX_PIECES} pieces");
        let rotation_limit = if rotations { 6 } else { 1 };

        let mut records = Vec::new();
        let mut piece_ranges = Vec::with_capacity(catalog.len());
        let mut targets = Vec::new();

        for (piece_index, piece) in catalog.iter().enumerate() {
            assert!(piece.size() <= usize::from(u8::MAX), "piece too large");
            let start = records.len() as u32;

            if !piece.cells.is_empty() {
                for (rotation, rotated) in distinct_rotations(&piece.cells, rotation_limit) {
                    for anchor in 0..board.len() as u16 {
                        let (anchor_q, anchor_r) = board.cell(anchor);
                        let targets_start = targets.len() as u32;

                        let mut on_board = true;
                        for &(q, r) in &rotated {
                            match board.index_of((q + anchor_q, r + anchor_r)) {
                                Some(index) => targets.push(index),
                                None => {
                                    on_board = false;
                                    break;
                                }
                            }
                        }

                        if on_board {
                            records.push(PlacementRecord {
                                piece: piece_index as u16,
                                piece_id: piece.id,
                                anchor,
                                rotation,
                                targets_start,
                                targets_len: rotated.len() as u8,
                            });
                        } else {
                            targets.truncate(targets_start as usize);
                        }
                    }
                }
            }

            piece_ranges.push((start, records.len() as u32 - start));
        }

        Self {
            records,
            piece_ranges,
            targets,
        }
    }

    /// Total number of compiled placements.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The contiguous placement-index range belonging to one piece.
    #[inline]
    pub fn piece_range(&self, piece: usize) -> Range<u32> {
        let (start, count) = self.piece_ranges[piece];
        start..start + count
    }

    /// Number of legal placements of one piece.
    #[inline]
    pub fn placement_count(&self, piece: usize) -> u32 {
        self.piece_ranges[piece].1
    }

    /// The record for a placement index.
    #[inline]
    pub fn record(&self, placement: u32) -> &PlacementRecord {
        &self.records[placement as usize]
    }

    /// The board cells a placement occupies.
    #[inline]
    pub fn targets(&self, placement: u32) -> &[u16] {
        let record = &self.records[placement as usize];
        &self.targets[record.targets_start as usize..][..usize::from(record.targets_len)]
    }
}
