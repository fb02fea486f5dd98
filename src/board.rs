//! Hex board representation and solution replay.
//!
//! The board is an arbitrary finite set of axial cells, each assigned a
//! stable dense index in `[0, len)` for the lifetime of a run. Per-cell
//! neighbor lists are precomputed in flat CSR form so the search loops never
//! perform coordinate arithmetic. This module also owns the placement-replay
//! logic (rotate offsets, translate by anchor, look up board cells) that the
//! placement compiler, canonical-signature computation, persistence and text
//! rendering all share.

use rustc_hash::FxHashMap;

use crate::geometry::{Hex, DIRECTIONS, ROTATIONS};
use crate::pieces::{Piece, PlacedPiece};

/// A finite hex board with dense cell indices and neighbor lists.
#[derive(Clone, Debug)]
pub struct Board {
    cells: Vec<Hex>,
    index: FxHashMap<Hex, u16>,
    neighbor_starts: Vec<u32>,
    neighbor_cells: Vec<u16>,
}

impl Board {
    /// Builds a board from an arbitrary cell set, ignoring duplicates.
    ///
    /// Cells are indexed in first-seen order; the mapping is fixed for the
    /// lifetime of the board.
    pub fn from_cells(cells: impl IntoIterator<Item = Hex>) -> Self {
        let mut index = FxHashMap::default();
        let mut unique: Vec<Hex> = Vec::new();

        for cell in cells {
            if !index.contains_key(&cell) {
                index.insert(cell, unique.len() as u16);
                unique.push(cell);
            }
        }
        assert!(
            unique.len() <= usize::from(u16::MAX),
            "board exceeds u16 cell indexing"
        );

        let mut neighbor_starts = Vec::with_capacity(unique.len() + 1);
        let mut neighbor_cells = Vec::new();
        neighbor_starts.push(0);
        for &(q, r) in &unique {
            for (dq, dr) in DIRECTIONS {
                if let Some(&neighbor) = index.get(&(q + dq, r + dr)) {
                    neighbor_cells.push(neighbor);
                }
            }
            neighbor_starts.push(neighbor_cells.len() as u32);
        }

        Self {
            cells: unique,
            index,
            neighbor_starts,
            neighbor_cells,
        }
    }

    /// Builds the standard rectangular board: `height` odd-r rows of `width`
    /// cells, with odd rows shifted half a cell to the right.
    pub fn rectangle(width: u16, height: u16) -> Self {
        let mut cells = Vec::with_capacity(usize::from(width) * usize::from(height));
        for row in 0..i32::from(height) {
            for col in 0..i32::from(width) {
                cells.push(offset_to_axial(col, row));
            }
        }
        Self::from_cells(cells)
    }

    /// Number of cells on the board.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Axial coordinates of the cell at a dense index.
    #[inline]
    pub fn cell(&self, index: u16) -> Hex {
        self.cells[usize::from(index)]
    }

    /// Dense index of a cell, or `None` if it is off the board.
    #[inline]
    pub fn index_of(&self, cell: Hex) -> Option<u16> {
        self.index.get(&cell).copied()
    }

    /// Dense indices of the on-board neighbors of a cell.
    #[inline]
    pub fn neighbors(&self, index: u16) -> &[u16] {
        let start = self.neighbor_starts[usize::from(index)] as usize;
        let end = self.neighbor_starts[usize::from(index) + 1] as usize;
        &self.neighbor_cells[start..end]
    }
}

/// Converts odd-r offset coordinates (column, row) to axial.
pub const fn offset_to_axial(col: i32, row: i32) -> Hex {
    (col - (row - (row & 1)) / 2, row)
}

/// Converts axial coordinates back to odd-r offset (column, row).
pub const fn axial_to_offset(cell: Hex) -> (i32, i32) {
    let (q, r) = cell;
    (q + (r - (r & 1)) / 2, r)
}

/// Computes the board cells a placement covers: rotate each piece offset by
/// the placement's rotation step, translate by the anchor, look up the dense
/// index. Returns `None` if any resulting cell is off the board.
///
/// This is the single replay path for a `(piece, rotation, anchor)` triple;
/// the compiler, signatures and rendering must all agree on it.
pub fn placement_targets(
    board: &Board,
    piece: &Piece,
    rotation: u8,
    anchor: Hex,
) -> Option<Vec<u16>> {
    let rotate = ROTATIONS[usize::from(rotation) % ROTATIONS.len()];
    let (anchor_q, anchor_r) = anchor;
    piece
        .cells
        .iter()
        .map(|&offset| {
            let (q, r) = rotate(offset);
            board.index_of((q + anchor_q, r + anchor_r))
        })
        .collect()
}

/// One canonical signature: sorted (covered cell index, owning piece id)
/// pairs. Two solutions are the same covering iff their signatures are equal,
/// regardless of placement order or discovery path.
pub type Signature = Vec<(u16, u32)>;

/// Computes the canonical cell-covering signature of a solution.
///
/// Placements referencing an unknown piece id or leaving the board contribute
/// nothing; the engine never produces those, but persisted solutions replayed
/// against a different board might.
pub fn signature(board: &Board, catalog: &[Piece], solution: &[PlacedPiece]) -> Signature {
    let mut pairs: Signature = Vec::new();
    for placed in solution {
        let Some(piece) = catalog.iter().find(|piece| piece.id == placed.piece_id) else {
            continue;
        };
        let Some(targets) = placement_targets(board, piece, placed.rotation, placed.anchor) else {
            continue;
        };
        for cell in targets {
            pairs.push((cell, placed.piece_id));
        }
    }
    pairs.sort_unstable();
    pairs
}

/// Renders a solution as text.
///
/// Odd-r rows top to bottom, odd rows indented half a cell. Covered cells
/// show the owning piece's glyph (by catalog position), empty board cells
/// show '.', and positions inside the bounding box but off the board are
/// blank.
pub fn format_solution(board: &Board, catalog: &[Piece], solution: &[PlacedPiece]) -> String {
    if board.is_empty() {
        return String::new();
    }

    let mut owner: Vec<Option<usize>> = vec![None; board.len()];
    for placed in solution {
        let Some((position, piece)) = catalog
            .iter()
            .enumerate()
            .find(|(_, piece)| piece.id == placed.piece_id)
        else {
            continue;
        };
        if let Some(targets) = placement_targets(board, piece, placed.rotation, placed.anchor) {
            for cell in targets {
                owner[usize::from(cell)] = Some(position);
            }
        }
    }

    let offsets: Vec<(i32, i32)> = board.cells.iter().map(|&cell| axial_to_offset(cell)).collect();
    let min_col = offsets.iter().map(|(col, _)| *col).min().unwrap();
    let max_col = offsets.iter().map(|(col, _)| *col).max().unwrap();
    let min_row = offsets.iter().map(|(_, row)| *row).min().unwrap();
    let max_row = offsets.iter().map(|(_, row)| *row).max().unwrap();

    let mut output = String::new();
    for row in min_row..=max_row {
        let mut line = String::new();
        if row & 1 != 0 {
            // odd rows sit half a cell to the right
            line.push(' ');
        }
        for col in min_col..=max_col {
            let glyph = match board.index_of(offset_to_axial(col, row)) {
                Some(index) => match owner[usize::from(index)] {
                    Some(position) => piece_glyph(position),
                    None => '.',
                },
                None => ' ',
            };
            line.push(glyph);
        }
        output.push_str(line.trim_end());
        output.push('\n');
    }

    output
}

/// Display glyph for a catalog position: 1-9, then A-Z.
fn piece_glyph(position: usize) -> char {
    let number = position + 1;
    if number < 10 {
        char::from(b'0' + number as u8)
    } else if number < 36 {
        char::from(b'A' + (number - 10) as u8)
    } else {
        '?'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_cell_count() {
        assert_eq!(Board::rectangle(5, 4).len(), 20);
        assert_eq!(Board::rectangle(0, 3).len(), 0);
    }

    #[test]
    fn test_offset_roundtrip() {
        for row in -3..=3 {
            for col in -3..=3 {
                let cell = offset_to_axial(col, row);
                assert_eq!(axial_to_offset(cell), (col, row), "roundtrip at ({col},{row})");
            }
        }
    }

    #[test]
    fn test_index_roundtrip() {
        let board = Board::rectangle(4, 3);
        for index in 0..board.len() as u16 {
            assert_eq!(board.index_of(board.cell(index)), Some(index));
        }
    }

    #[test]
    fn test_neighbors_are_symmetric_and_on_board() {
        let board = Board::rectangle(4, 4);
        for cell in 0..board.len() as u16 {
            for &neighbor in board.neighbors(cell) {
                assert!(usize::from(neighbor) < board.len());
                assert!(
                    board.neighbors(neighbor).contains(&cell),
                    "neighbor relation not symmetric for {cell} and {neighbor}"
                );
            }
        }
    }

    #[test]
    fn test_interior_cell_has_six_neighbors() {
        let board = Board::rectangle(3, 3);
        let center = board.index_of(offset_to_axial(1, 1)).unwrap();
        assert_eq!(board.neighbors(center).len(), 6);
    }

    #[test]
    fn test_placement_targets_rejects_off_board_cells() {
        let board = Board::rectangle(3, 1);
        let bar = Piece::new(0, vec![(-1, 0), (0, 0), (1, 0)]);

        let centered = placement_targets(&board, &bar, 0, (1, 0));
        assert_eq!(centered.map(|targets| targets.len()), Some(3));

        // anchored at the left edge, the bar hangs off the board
        assert_eq!(placement_targets(&board, &bar, 0, (0, 0)), None);
        // vertical rotation never fits a single-row board
        assert_eq!(placement_targets(&board, &bar, 1, (1, 0)), None);
    }

    #[test]
    fn test_signature_ignores_placement_order() {
        let board = Board::rectangle(4, 1);
        let catalog = vec![
            Piece::new(7, vec![(0, 0), (1, 0)]),
            Piece::new(9, vec![(0, 0)]),
        ];
        let forward = vec![
            PlacedPiece { piece_id: 7, anchor: (0, 0), rotation: 0 },
            PlacedPiece { piece_id: 9, anchor: (3, 0), rotation: 0 },
        ];
        let backward: Vec<_> = forward.iter().rev().copied().collect();

        let first = signature(&board, &catalog, &forward);
        assert_eq!(first, signature(&board, &catalog, &backward));
        // recomputation is idempotent
        assert_eq!(first, signature(&board, &catalog, &forward));
        assert_eq!(first, vec![(0, 7), (1, 7), (3, 9)]);
    }

    #[test]
    fn test_format_marks_covered_and_empty_cells() {
        let board = Board::rectangle(3, 2);
        let catalog = vec![Piece::new(0, vec![(-1, 0), (0, 0), (1, 0)])];
        let solution = vec![PlacedPiece { piece_id: 0, anchor: (1, 0), rotation: 0 }];

        let text = format_solution(&board, &catalog, &solution);
        assert_eq!(text, "111\n ...\n");
    }
}
