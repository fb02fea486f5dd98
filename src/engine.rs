//! Run orchestration: work partitioning, worker threads, and result
//! aggregation.
//!
//! The search is decomposed statically: the piece with the fewest legal
//! placements becomes the fixed first piece, its placement list is split
//! into contiguous slices, and one worker thread searches each slice.
//! Workers share nothing mutable with each other; the compiled tables,
//! catalog and board are read-only behind `Arc`, and the only cross-worker
//! values are the stop flag and the published best-coverage bound. All
//! replace/merge/discard decisions on the global best happen on a single
//! aggregator thread consuming one channel.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;

use crate::board::{signature, Board, Signature};
use crate::pieces::{Piece, Solution, MAX_PIECES};
use crate::placement::PlacementTable;
use crate::solver::{SearchKernel, WorkerMessage};

/// Options for one search run.
#[derive(Clone, Debug)]
pub struct SolveOptions {
    /// Allow all 6 rotations of each piece; false pins rotation step 0.
    pub rotations: bool,
    /// Worker thread count; defaults to the number of logical CPUs.
    pub workers: Option<usize>,
    /// Pre-seeded best-known coverage to prune against from the start.
    pub seed_coverage: u16,
    /// Cadence of progress events to the caller.
    pub progress_interval: Duration,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            rotations: true,
            workers: None,
            seed_coverage: 0,
            progress_interval: Duration::from_secs(1),
        }
    }
}

/// An asynchronous event from a running search.
#[derive(Clone, Debug)]
pub enum SearchEvent {
    /// Periodic progress: node count summed across workers and the current
    /// global best coverage.
    Progress {
        nodes: u64,
        best_coverage: u16,
        elapsed: Duration,
    },
    /// The run is final; no further events follow.
    Complete(RunSummary),
}

/// The final outcome of a run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub best_coverage: u16,
    /// Every distinct best covering, canonically deduplicated across workers.
    pub solutions: Vec<Solution>,
    /// Total search nodes across all workers.
    pub nodes: u64,
    pub elapsed: Duration,
    /// Workers that disappeared without reporting. A fault inside one worker
    /// does not corrupt the run; it just stops contributing.
    pub failed_workers: usize,
}

/// Handle to a running search: the event stream plus cooperative stop.
pub struct SearchHandle {
    events: Receiver<SearchEvent>,
    stop: Arc<AtomicBool>,
}

impl SearchHandle {
    /// The event stream. Ends shortly after `SearchEvent::Complete`.
    pub fn events(&self) -> &Receiver<SearchEvent> {
        &self.events
    }

    /// Requests a cooperative stop. Workers acknowledge by completing with
    /// their best-so-far results; the run still ends with `Complete`.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Blocks until the run is final, discarding progress events.
    pub fn wait(self) -> RunSummary {
        for event in self.events.iter() {
            if let SearchEvent::Complete(summary) = event {
                return summary;
            }
        }
        // the aggregator never drops its sender before completing; this is
        // only reachable if it was killed externally
        RunSummary {
            best_coverage: 0,
            solutions: Vec::new(),
            nodes: 0,
            elapsed: Duration::ZERO,
            failed_workers: 0,
        }
    }
}

/// Starts a search run and returns immediately.
///
/// Compiles the placement tables, partitions the first piece's placements
/// across up to `options.workers` threads, and spawns the aggregator. With
/// nothing placeable anywhere, no workers spawn and the run completes at
/// coverage 0.
pub fn spawn_search(
    board: Arc<Board>,
    catalog: Arc<Vec<Piece>>,
    options: SolveOptions,
) -> SearchHandle {
    assert!(catalog.len() <= MAX_PIECES, "catalog exceeds {MAX_PIECES} pieces");

    let table = Arc::new(PlacementTable::compile(&board, &catalog, options.rotations));
    let stop = Arc::new(AtomicBool::new(false));
    // a seed beyond what the board or catalog can yield would poison the
    // reported coverage, so cap it at both
    let size_sum: u16 = catalog.iter().map(|piece| piece.size() as u16).sum();
    let seed = options.seed_coverage.min(board.len() as u16).min(size_sum);
    let shared_best = Arc::new(AtomicU32::new(u32::from(seed)));

    let (worker_tx, worker_rx) = mpsc::channel();
    let (event_tx, event_rx) = mpsc::channel();
    let started = Instant::now();
    let interval = options.progress_interval;

    let mut spawned = 0;
    if let Some(first) = pick_first_piece(&table, &catalog) {
        let rest_mask = full_mask(catalog.len()) & !(1u64 << first);
        let rest_size: u16 = catalog
            .iter()
            .enumerate()
            .filter(|&(index, _)| index != first)
            .map(|(_, piece)| piece.size() as u16)
            .sum();

        let worker_count = options.workers.unwrap_or_else(num_cpus::get).max(1);
        for (worker, slice) in split_slices(table.piece_range(first), worker_count)
            .into_iter()
            .enumerate()
        {
            let board = Arc::clone(&board);
            let catalog = Arc::clone(&catalog);
            let table = Arc::clone(&table);
            let stop = Arc::clone(&stop);
            let shared_best = Arc::clone(&shared_best);
            let tx = worker_tx.clone();
            thread::spawn(move || {
                let mut kernel = SearchKernel::new(
                    &board,
                    &catalog,
                    &table,
                    &stop,
                    &shared_best,
                    &tx,
                    worker,
                    interval,
                );
                let report = kernel.run(slice, rest_mask, rest_size);
                let _ = tx.send(WorkerMessage::Done(report));
            });
            spawned += 1;
        }
    }
    // the aggregator's receive loop must end once all workers are gone
    drop(worker_tx);

    {
        let board = Arc::clone(&board);
        let catalog = Arc::clone(&catalog);
        let shared_best = Arc::clone(&shared_best);
        thread::spawn(move || {
            aggregate(
                &board,
                &catalog,
                worker_rx,
                &event_tx,
                &shared_best,
                spawned,
                started,
                interval,
            );
        });
    }

    SearchHandle {
        events: event_rx,
        stop,
    }
}

/// Runs a search to completion, blocking the caller.
pub fn solve(board: &Board, catalog: &[Piece], options: SolveOptions) -> RunSummary {
    spawn_search(Arc::new(board.clone()), Arc::new(catalog.to_vec()), options).wait()
}

/// Selects the fixed first piece: fewest total placements among pieces that
/// can be placed at all, ties broken by catalog order.
///
/// Partitioning on the most constrained piece keeps slices balanced and
/// failure-prone branches short. Unplaceable pieces are skipped here; they
/// simply never appear in any solution, and must not empty the whole search.
fn pick_first_piece(table: &PlacementTable, catalog: &[Piece]) -> Option<usize> {
    (0..catalog.len())
        .filter(|&piece| table.placement_count(piece) > 0)
        .min_by_key(|&piece| table.placement_count(piece))
}

/// Bitmask with one bit per catalog piece.
fn full_mask(count: usize) -> u64 {
    if count >= 64 {
        u64::MAX
    } else {
        (1u64 << count) - 1
    }
}

/// Splits a placement range into at most `workers` contiguous, roughly equal
/// slices. Never produces an empty slice.
fn split_slices(range: Range<u32>, workers: usize) -> Vec<Range<u32>> {
    let total = (range.end - range.start) as usize;
    if total == 0 || workers == 0 {
        return Vec::new();
    }
    let workers = workers.min(total);
    let base = total / workers;
    let extra = total % workers;

    let mut slices = Vec::with_capacity(workers);
    let mut start = range.start;
    for worker in 0..workers {
        let len = base + usize::from(worker < extra);
        let end = start + len as u32;
        slices.push(start..end);
        start = end;
    }
    slices
}

/// The aggregator loop: the single place where the global best advances.
///
/// Progress messages update per-worker node counts and publish bound
/// improvements; completion messages replace, merge or discard the reported
/// solutions depending on how their coverage compares to the global best.
fn aggregate(
    board: &Board,
    catalog: &[Piece],
    rx: Receiver<WorkerMessage>,
    events: &Sender<SearchEvent>,
    shared_best: &AtomicU32,
    workers: usize,
    started: Instant,
    interval: Duration,
) {
    let mut node_counts = vec![0u64; workers];
    let mut best: u16 = 0;
    let mut solutions: Vec<Solution> = Vec::new();
    let mut seen: FxHashSet<Signature> = FxHashSet::default();
    let mut completed = 0;
    let mut last_progress = Instant::now();

    while completed < workers {
        // a recv error means every remaining worker died without reporting
        let Ok(message) = rx.recv() else {
            break;
        };
        match message {
            WorkerMessage::Progress {
                worker,
                nodes,
                best: worker_best,
            } => {
                node_counts[worker] = nodes;
                shared_best.fetch_max(u32::from(worker_best), Ordering::Relaxed);
                if worker_best > best {
                    // solutions held at a lower coverage are superseded
                    best = worker_best;
                    solutions.clear();
                    seen.clear();
                }
                if last_progress.elapsed() >= interval {
                    let _ = events.send(SearchEvent::Progress {
                        nodes: node_counts.iter().sum(),
                        best_coverage: best,
                        elapsed: started.elapsed(),
                    });
                    last_progress = Instant::now();
                }
            }
            WorkerMessage::Done(report) => {
                completed += 1;
                node_counts[report.worker] = report.nodes;
                shared_best.fetch_max(u32::from(report.coverage), Ordering::Relaxed);
                if report.coverage > best {
                    best = report.coverage;
                    solutions.clear();
                    seen.clear();
                }
                if report.coverage == best {
                    for solution in report.solutions {
                        let key = signature(board, catalog, &solution);
                        if seen.insert(key) {
                            solutions.push(solution);
                        }
                    }
                }
                // reports below the global best lost the race; drop them
            }
        }
    }

    let _ = events.send(SearchEvent::Complete(RunSummary {
        best_coverage: best,
        solutions,
        nodes: node_counts.iter().sum(),
        elapsed: started.elapsed(),
        failed_workers: workers - completed,
    }));
}
