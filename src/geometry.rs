//! Hex rotation and neighbor utilities.
//!
//! Cells live in axial coordinates `(q, r)`. A polyhex shape has up to 6
//! distinct orientations, one per 60-degree rotation step around the axial
//! origin, and every cell has exactly 6 potential neighbors.

/// An axial hex coordinate.
pub type Hex = (i32, i32);

/// The six neighbor directions in axial coordinates.
///
/// Ordered counterclockwise starting from east. Rotating a direction by one
/// 60-degree step yields the next entry.
pub const DIRECTIONS: [Hex; 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

/// All 6 rotation functions for a hex shape.
///
/// Index `k` rotates by `k` 60-degree counterclockwise steps around the
/// axial origin. Placement records store these indices, so the ordering
/// must stay in sync with everything that replays placements.
pub const ROTATIONS: [fn(Hex) -> Hex; 6] = [
    |(q, r)| (q, r),      // 0 degrees
    |(q, r)| (-r, q + r), // 60 degrees
    |(q, r)| (-q - r, q), // 120 degrees
    |(q, r)| (-q, -r),    // 180 degrees
    |(q, r)| (r, -q - r), // 240 degrees
    |(q, r)| (q + r, -q), // 300 degrees
];

/// Generates the distinct rotations of a piece shape.
///
/// Applies the first `limit` rotations (1 when rotation is disabled, else 6),
/// then removes rotations whose cell set matches an earlier one modulo
/// translation. Symmetric shapes produce fewer entries: a single hex has one,
/// a straight bar three. Returns `(rotation step, rotated offsets)` pairs,
/// keeping the lowest step for each distinct shape.
pub fn distinct_rotations(cells: &[Hex], limit: usize) -> Vec<(u8, Vec<Hex>)> {
    let mut seen: Vec<Vec<Hex>> = Vec::new();
    let mut rotations = Vec::new();

    for (step, rotate) in ROTATIONS.iter().take(limit).enumerate() {
        let rotated: Vec<Hex> = cells.iter().map(|&cell| rotate(cell)).collect();
        let key = normalize_to_origin(rotated.clone());
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        rotations.push((step as u8, rotated));
    }

    rotations
}

/// Translates coordinates so the minimum q and r values are both zero, then
/// sorts them.
///
/// Two rotations that differ only by translation normalize to the same form,
/// so they would compile to the same placement sets and only one is kept.
fn normalize_to_origin(mut cells: Vec<Hex>) -> Vec<Hex> {
    let min_q = cells.iter().map(|(q, _)| *q).min().unwrap();
    let min_r = cells.iter().map(|(_, r)| *r).min().unwrap();

    for (q, r) in &mut cells {
        *q -= min_q;
        *r -= min_r;
    }

    cells.sort_unstable();
    cells
}
