//! Piece definitions and placement types.
//!
//! Each piece is a set of axial cell offsets around an implicit center.
//! Catalog order establishes the stable piece index used throughout the
//! engine; the id is whatever the caller (e.g. a piece editor) assigned.

use crate::geometry::Hex;

/// Largest catalog the engine supports (remaining pieces are a u64 bitmask).
pub const MAX_PIECES: usize = 64;

/// A polyhex piece: a caller-assigned id and the cell offsets of its shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Piece {
    pub id: u32,
    pub cells: Vec<Hex>,
}

impl Piece {
    pub fn new(id: u32, cells: Vec<Hex>) -> Self {
        Self { id, cells }
    }

    /// Number of cells this piece covers.
    #[inline]
    pub fn size(&self) -> usize {
        self.cells.len()
    }
}

/// A piece placed on the board: one element of an exported solution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacedPiece {
    pub piece_id: u32,
    /// Axial coordinates of the anchor cell.
    pub anchor: Hex,
    /// Rotation step (0-5) applied to the piece offsets.
    pub rotation: u8,
}

/// A solution: placements in the order the search chose them.
pub type Solution = Vec<PlacedPiece>;

/// The three trihexes (3 cells each).
pub const TRIHEXES: &[&[Hex]] = &[
    // straight bar
    &[(-1, 0), (0, 0), (1, 0)],
    // bent bar
    &[(-1, 0), (0, 0), (1, -1)],
    // triangle
    &[(0, 0), (1, 0), (0, 1)],
];

/// The seven tetrahexes (4 cells each).
pub const TETRAHEXES: &[&[Hex]] = &[
    // straight bar
    &[(-1, 0), (0, 0), (1, 0), (2, 0)],
    // worm (shallow zigzag)
    &[(-1, 0), (0, 0), (1, -1), (2, -1)],
    // pistol (bar with a hook)
    &[(-1, 0), (0, 0), (1, 0), (-1, 1)],
    // bee (rhombus)
    &[(0, 0), (1, 0), (0, 1), (1, 1)],
    // propeller (three arms 120 degrees apart)
    &[(0, 0), (1, 0), (0, -1), (-1, 1)],
    // arch (triangle with a tail)
    &[(0, 0), (1, 0), (0, 1), (-1, 1)],
    // wye (three arms, two of them opposite)
    &[(0, 0), (1, 0), (0, -1), (0, 1)],
];

/// Builds a piece catalog from shape tables, assigning ids by table order.
pub fn catalog(shapes: &[&[Hex]]) -> Vec<Piece> {
    shapes
        .iter()
        .enumerate()
        .map(|(index, cells)| Piece::new(index as u32, cells.to_vec()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DIRECTIONS;

    /// Every catalog shape must be edge-connected.
    fn assert_connected(cells: &[Hex]) {
        let mut reached = vec![cells[0]];
        loop {
            let next = cells.iter().find(|&&(q, r)| {
                !reached.contains(&(q, r))
                    && DIRECTIONS
                        .iter()
                        .any(|&(dq, dr)| reached.contains(&(q + dq, r + dr)))
            });
            match next {
                Some(&cell) => reached.push(cell),
                None => break,
            }
        }
        assert_eq!(reached.len(), cells.len(), "disconnected shape {cells:?}");
    }

    #[test]
    fn test_trihexes_are_connected_and_sized() {
        for shape in TRIHEXES {
            assert_eq!(shape.len(), 3);
            assert_connected(shape);
        }
    }

    #[test]
    fn test_tetrahexes_are_connected_and_sized() {
        for shape in TETRAHEXES {
            assert_eq!(shape.len(), 4);
            assert_connected(shape);
        }
    }

    #[test]
    fn test_catalog_assigns_ids_in_table_order() {
        let pieces = catalog(TRIHEXES);
        assert_eq!(pieces.len(), 3);
        for (index, piece) in pieces.iter().enumerate() {
            assert_eq!(piece.id, index as u32);
            assert_eq!(piece.size(), 3);
        }
    }
}
