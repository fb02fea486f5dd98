//! The backtracking search kernel.
//!
//! One kernel runs per worker, against one slice of first-piece placements.
//! Key mechanics:
//! - Depth-stamped occupancy arrays for exact, allocation-free undo
//! - Most-constrained-piece selection with short-circuited counting
//! - Adjacency-scored move ordering (compact placements first)
//! - Bound pruning that keeps any branch which can still tie the best
//! - Canonical cell-covering dedup of recorded solutions
//!
//! Only two signals unwind the recursion: the cooperative stop flag and a
//! perfect cover. Both terminate this worker's slice; dead ends and bound
//! failures are plain control flow.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;

use crate::board::{signature, Board, Signature};
use crate::pieces::{Piece, PlacedPiece, Solution};
use crate::placement::PlacementTable;

/// Occupancy sentinel: no piece owns the cell.
const EMPTY: u16 = u16::MAX;

/// Nodes searched between wall-clock reads. Progress cadence itself is
/// time-based; this only amortizes the clock calls in the hot loop.
const CLOCK_CHECK_INTERVAL: u64 = 1024;

/// A message from a worker to the aggregator.
pub(crate) enum WorkerMessage {
    Progress { worker: usize, nodes: u64, best: u16 },
    Done(WorkerReport),
}

/// A worker's completion report.
pub(crate) struct WorkerReport {
    pub worker: usize,
    pub nodes: u64,
    /// The worker's final local best coverage.
    pub coverage: u16,
    /// Deduplicated solutions at that coverage.
    pub solutions: Vec<Solution>,
}

/// Outcome of one recursion frame.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// The subtree was explored (or pruned); continue with siblings.
    Explored,
    /// Stop signal or perfect cover; unwind to the top of this worker.
    Halt,
}

/// Per-worker search state. Everything here is worker-local; the only shared
/// values are the stop flag and the published best-coverage bound.
pub(crate) struct SearchKernel<'a> {
    board: &'a Board,
    catalog: &'a [Piece],
    table: &'a PlacementTable,
    stop: &'a AtomicBool,
    shared_best: &'a AtomicU32,
    tx: &'a Sender<WorkerMessage>,
    worker: usize,
    interval: Duration,

    occupancy: Vec<u16>,
    /// Recursion depth at which each cell was last occupied (0 = never).
    stamps: Vec<u16>,
    /// Placement indices along the current path.
    chosen: Vec<u32>,

    best: u16,
    solutions: Vec<Solution>,
    seen: FxHashSet<Signature>,
    nodes: u64,
    last_report: Instant,
}

impl<'a> SearchKernel<'a> {
    pub(crate) fn new(
        board: &'a Board,
        catalog: &'a [Piece],
        table: &'a PlacementTable,
        stop: &'a AtomicBool,
        shared_best: &'a AtomicU32,
        tx: &'a Sender<WorkerMessage>,
        worker: usize,
        interval: Duration,
    ) -> Self {
        Self {
            board,
            catalog,
            table,
            stop,
            shared_best,
            tx,
            worker,
            interval,
            occupancy: vec![EMPTY; board.len()],
            stamps: vec![0; board.len()],
            chosen: Vec::new(),
            best: shared_best.load(Ordering::Relaxed) as u16,
            solutions: Vec::new(),
            seen: FxHashSet::default(),
            nodes: 0,
            last_report: Instant::now(),
        }
    }

    /// Runs this worker's assigned slice of first-piece placements.
    ///
    /// Each top-level placement is applied at depth 1, searched, and fully
    /// undone before the next one, so every iteration starts from a clean
    /// board.
    pub(crate) fn run(
        &mut self,
        slice: Range<u32>,
        rest_mask: u64,
        rest_size: u16,
    ) -> WorkerReport {
        for placement in slice {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            self.refresh_bound();

            let coverage = self.table.targets(placement).len() as u16;
            self.apply(placement, 1);
            self.chosen.push(placement);
            let flow = self.search(rest_mask, rest_size, coverage, 2);
            self.chosen.pop();
            self.undo(placement, 1);

            if flow == Flow::Halt {
                break;
            }
        }

        WorkerReport {
            worker: self.worker,
            nodes: self.nodes,
            coverage: self.best,
            solutions: std::mem::take(&mut self.solutions),
        }
    }

    /// Picks up bound improvements published by sibling workers. Solutions
    /// recorded under a lower coverage can no longer win and are dropped.
    fn refresh_bound(&mut self) {
        let published = self.shared_best.load(Ordering::Relaxed) as u16;
        if published > self.best {
            self.best = published;
            self.solutions.clear();
            self.seen.clear();
        }
    }

    /// The backtracking procedure.
    ///
    /// `remaining` is the bitmask of unplaced pieces, `remaining_size` the
    /// sum of their sizes (carried and decremented, never recomputed), and
    /// `depth` the stamp for placements applied by this frame.
    fn search(&mut self, remaining: u64, remaining_size: u16, coverage: u16, depth: u16) -> Flow {
        if self.stop.load(Ordering::Relaxed) {
            return Flow::Halt;
        }

        self.nodes += 1;
        if self.nodes % CLOCK_CHECK_INTERVAL == 0 && self.last_report.elapsed() >= self.interval {
            let _ = self.tx.send(WorkerMessage::Progress {
                worker: self.worker,
                nodes: self.nodes,
                best: self.best,
            });
            self.last_report = Instant::now();
        }

        if coverage > self.best {
            self.best = coverage;
            self.solutions.clear();
            self.seen.clear();
            self.record();
        } else if coverage == self.best && coverage > 0 {
            self.record();
        }

        if coverage == self.board.len() as u16 {
            // perfect cover; nothing in this worker's slice can do better
            return Flow::Halt;
        }
        if u32::from(coverage) + u32::from(remaining_size) < u32::from(self.best) {
            // cannot even tie the best from here
            return Flow::Explored;
        }
        if remaining == 0 {
            return Flow::Explored;
        }

        let Some(piece) = self.most_constrained_piece(remaining) else {
            // every remaining piece is blocked
            return Flow::Explored;
        };

        let piece_size = self.catalog[usize::from(piece)].size() as u16;
        let piece_bit = 1u64 << piece;

        for placement in self.ordered_placements(piece) {
            if self.stop.load(Ordering::Relaxed) {
                return Flow::Halt;
            }

            let gain = self.table.targets(placement).len() as u16;
            self.apply(placement, depth);
            self.chosen.push(placement);
            let flow = self.search(
                remaining & !piece_bit,
                remaining_size - piece_size,
                coverage + gain,
                depth + 1,
            );
            self.chosen.pop();
            self.undo(placement, depth);

            if flow == Flow::Halt {
                return Flow::Halt;
            }
        }

        Flow::Explored
    }

    /// Records the current path as a solution if its covering is new.
    fn record(&mut self) {
        let solution: Solution = self
            .chosen
            .iter()
            .map(|&placement| {
                let record = self.table.record(placement);
                PlacedPiece {
                    piece_id: record.piece_id,
                    anchor: self.board.cell(record.anchor),
                    rotation: record.rotation,
                }
            })
            .collect();

        let key = signature(self.board, self.catalog, &solution);
        if self.seen.insert(key) {
            self.solutions.push(solution);
        }
    }

    /// Most-constrained-piece rule: the remaining piece with the fewest
    /// currently-legal placements. Counting short-circuits as soon as a piece
    /// can no longer beat the running minimum. Returns `None` when every
    /// remaining piece is blocked.
    fn most_constrained_piece(&self, remaining: u64) -> Option<u16> {
        let mut best_piece = None;
        let mut best_count = u32::MAX;

        let mut mask = remaining;
        while mask != 0 {
            let piece = mask.trailing_zeros() as u16;
            mask &= mask - 1;

            let mut count = 0u32;
            for placement in self.table.piece_range(usize::from(piece)) {
                if self.fits(placement) {
                    count += 1;
                    if count >= best_count {
                        break;
                    }
                }
            }
            if count > 0 && count < best_count {
                best_count = count;
                best_piece = Some(piece);
            }
        }

        best_piece
    }

    /// A placement fits iff every target cell is empty.
    #[inline]
    fn fits(&self, placement: u32) -> bool {
        self.table
            .targets(placement)
            .iter()
            .all(|&cell| self.occupancy[usize::from(cell)] == EMPTY)
    }

    /// Enumerates the currently-legal placements of a piece, most-adjacent
    /// first: each placement scores the occupied neighbors of its target
    /// cells, biasing the search toward compact, less fragmenting packings.
    /// The sort is stable, so ties keep compiled placement order.
    fn ordered_placements(&self, piece: u16) -> Vec<u32> {
        let mut scored: Vec<(u32, u32)> = Vec::new();
        for placement in self.table.piece_range(usize::from(piece)) {
            if !self.fits(placement) {
                continue;
            }
            let mut score = 0u32;
            for &cell in self.table.targets(placement) {
                for &neighbor in self.board.neighbors(cell) {
                    if self.occupancy[usize::from(neighbor)] != EMPTY {
                        score += 1;
                    }
                }
            }
            scored.push((score, placement));
        }

        scored.sort_by_key(|&(score, _)| std::cmp::Reverse(score));
        scored.into_iter().map(|(_, placement)| placement).collect()
    }

    /// Occupies a placement's target cells, stamping them with the depth.
    fn apply(&mut self, placement: u32, depth: u16) {
        let piece = self.table.record(placement).piece;
        for &cell in self.table.targets(placement) {
            self.occupancy[usize::from(cell)] = piece;
            self.stamps[usize::from(cell)] = depth;
        }
    }

    /// Clears exactly the cells this placement stamped at this depth.
    fn undo(&mut self, placement: u32, depth: u16) {
        for &cell in self.table.targets(placement) {
            if self.stamps[usize::from(cell)] == depth {
                self.occupancy[usize::from(cell)] = EMPTY;
                self.stamps[usize::from(cell)] = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    struct Fixture {
        board: Board,
        catalog: Vec<Piece>,
        table: PlacementTable,
        stop: AtomicBool,
        shared_best: AtomicU32,
    }

    impl Fixture {
        fn new(board: Board, catalog: Vec<Piece>) -> Self {
            let table = PlacementTable::compile(&board, &catalog, true);
            Self {
                board,
                catalog,
                table,
                stop: AtomicBool::new(false),
                shared_best: AtomicU32::new(0),
            }
        }

        /// Runs a single kernel over the full placement range of `first`,
        /// returning the report and the kernel's final occupancy state.
        fn run(&self, first: usize) -> (WorkerReport, Vec<u16>) {
            let (tx, _rx) = mpsc::channel();
            let mut kernel = SearchKernel::new(
                &self.board,
                &self.catalog,
                &self.table,
                &self.stop,
                &self.shared_best,
                &tx,
                0,
                Duration::from_secs(1),
            );
            let full_mask = (1u64 << self.catalog.len()) - 1;
            let rest_mask = full_mask & !(1u64 << first);
            let rest_size: u16 = self
                .catalog
                .iter()
                .enumerate()
                .filter(|&(index, _)| index != first)
                .map(|(_, piece)| piece.size() as u16)
                .sum();
            let report = kernel.run(self.table.piece_range(first), rest_mask, rest_size);
            (report, kernel.occupancy.clone())
        }
    }

    #[test]
    fn test_single_cell_perfect_cover() {
        let fixture = Fixture::new(Board::rectangle(1, 1), vec![Piece::new(0, vec![(0, 0)])]);
        let (report, _) = fixture.run(0);

        assert_eq!(report.coverage, 1);
        assert_eq!(report.solutions.len(), 1);
        assert_eq!(report.solutions[0].len(), 1);
        assert_eq!(report.solutions[0][0].piece_id, 0);
    }

    #[test]
    fn test_occupancy_is_fully_cleared_after_a_run() {
        let fixture = Fixture::new(
            Board::rectangle(4, 2),
            vec![
                Piece::new(0, vec![(0, 0), (1, 0)]),
                Piece::new(1, vec![(0, 0)]),
            ],
        );
        let (report, occupancy) = fixture.run(0);

        assert_eq!(report.coverage, 3);
        assert!(occupancy.iter().all(|&cell| cell == EMPTY), "occupancy leaked");
    }

    #[test]
    fn test_solutions_are_deduplicated_by_covering() {
        let fixture = Fixture::new(
            Board::rectangle(3, 1),
            vec![
                Piece::new(0, vec![(0, 0)]),
                Piece::new(1, vec![(0, 0)]),
            ],
        );
        let (report, _) = fixture.run(0);

        assert_eq!(report.coverage, 2);
        let signatures: FxHashSet<Signature> = report
            .solutions
            .iter()
            .map(|solution| signature(&fixture.board, &fixture.catalog, solution))
            .collect();
        assert_eq!(
            signatures.len(),
            report.solutions.len(),
            "duplicate coverings recorded"
        );
    }

    #[test]
    fn test_pre_raised_stop_reports_immediately() {
        let fixture = Fixture::new(Board::rectangle(3, 3), vec![Piece::new(0, vec![(0, 0)])]);
        fixture.stop.store(true, Ordering::Relaxed);
        let (report, occupancy) = fixture.run(0);

        assert_eq!(report.coverage, 0);
        assert_eq!(report.nodes, 0);
        assert!(report.solutions.is_empty());
        assert!(occupancy.iter().all(|&cell| cell == EMPTY));
    }

    #[test]
    fn test_seeded_bound_still_records_ties() {
        // seeding the bound at the true optimum must not lose tied solutions
        let fixture = Fixture::new(
            Board::rectangle(2, 1),
            vec![
                Piece::new(0, vec![(0, 0)]),
                Piece::new(1, vec![(0, 0)]),
            ],
        );
        fixture.shared_best.store(2, Ordering::Relaxed);
        let (report, _) = fixture.run(0);

        assert_eq!(report.coverage, 2);
        assert!(!report.solutions.is_empty());
    }
}
