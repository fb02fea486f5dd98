//! Polyhex Packing Search
//!
//! Packs a catalog of polyhex pieces onto a rectangular hex board, searching
//! in parallel for the coverings that fill the most cells. Every distinct
//! best covering is reported, deduplicated by the cells each piece ends up
//! owning, and saved to disk for later display.

use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};

use hexpack::board::{format_solution, Board};
use hexpack::{persistence, pieces, spawn_search, SearchEvent, SolveOptions};

/// Searches for maximum-coverage polyhex packings and prints the results.
#[derive(Parser)]
#[command(name = "hexpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Search the board and save the best coverings to disk.
    Solve(SolveArgs),
    /// Print saved solutions.
    Show(ShowArgs),
    /// Show the number of saved solutions.
    Count,
}

#[derive(Args)]
struct SolveArgs {
    /// Board width in cells.
    #[arg(long, default_value_t = 5)]
    width: u16,
    /// Board height in rows.
    #[arg(long, default_value_t = 6)]
    height: u16,
    /// Piece catalog to pack.
    #[arg(long, value_enum, default_value_t = Catalog::Tetrahexes)]
    pieces: Catalog,
    /// Worker thread count (defaults to the number of logical CPUs).
    #[arg(long)]
    workers: Option<usize>,
    /// Keep every piece in its base orientation.
    #[arg(long)]
    no_rotations: bool,
}

#[derive(Args)]
struct ShowArgs {
    /// Piece catalog the saved run was solved with (piece shapes are not
    /// stored alongside solutions).
    #[arg(long, value_enum, default_value_t = Catalog::Tetrahexes)]
    pieces: Catalog,
}

#[derive(Clone, Copy, ValueEnum)]
enum Catalog {
    Trihexes,
    Tetrahexes,
}

impl Catalog {
    fn pieces(self) -> Vec<pieces::Piece> {
        match self {
            Self::Trihexes => pieces::catalog(pieces::TRIHEXES),
            Self::Tetrahexes => pieces::catalog(pieces::TETRAHEXES),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Solve(args)) => run_solve(&args),
        Some(Command::Show(args)) => run_show(&args),
        Some(Command::Count) => run_count(),
        None => {
            // default: solve the standard board with the tetrahex catalog
            run_solve(&SolveArgs {
                width: 5,
                height: 6,
                pieces: Catalog::Tetrahexes,
                workers: None,
                no_rotations: false,
            });
        }
    }
}

/// Solves the board, saves the results, and prints the best covering.
fn run_solve(args: &SolveArgs) {
    let board = Arc::new(Board::rectangle(args.width, args.height));
    let catalog = Arc::new(args.pieces.pieces());
    let options = SolveOptions {
        rotations: !args.no_rotations,
        workers: args.workers,
        ..SolveOptions::default()
    };

    let handle = spawn_search(Arc::clone(&board), Arc::clone(&catalog), options);
    let summary = loop {
        match handle.events().recv() {
            Ok(SearchEvent::Progress {
                nodes,
                best_coverage,
                elapsed,
            }) => {
                println!(
                    "{:>7.1}s  {} nodes, best coverage {}",
                    elapsed.as_secs_f64(),
                    nodes,
                    best_coverage
                );
            }
            Ok(SearchEvent::Complete(summary)) => break summary,
            Err(_) => {
                eprintln!("Search ended without completing");
                return;
            }
        }
    };

    if summary.failed_workers > 0 {
        eprintln!(
            "{} worker(s) failed; results are best-effort",
            summary.failed_workers
        );
    }
    println!(
        "Best coverage {} of {} cells, {} distinct solutions, {} nodes in {:.1}s",
        summary.best_coverage,
        board.len(),
        summary.solutions.len(),
        summary.nodes,
        summary.elapsed.as_secs_f64()
    );

    if let Err(e) = persistence::save(
        args.width,
        args.height,
        summary.best_coverage,
        &catalog,
        &summary.solutions,
    ) {
        eprintln!("Failed to save solutions: {}", e);
    } else {
        println!("Wrote solutions.txt and solutions.bin");
    }

    if let Some(solution) = summary.solutions.first() {
        println!();
        print!("{}", format_solution(&board, &catalog, solution));
    }
}

/// Loads and prints saved solutions.
fn run_show(args: &ShowArgs) {
    match persistence::load() {
        Some(run) => {
            let board = Board::rectangle(run.width, run.height);
            let catalog = args.pieces.pieces();
            println!(
                "{} solutions covering {} of {} cells",
                run.solutions.len(),
                run.coverage,
                board.len()
            );
            for (i, solution) in run.solutions.iter().enumerate() {
                println!("\nSolution {}:", i + 1);
                print!("{}", format_solution(&board, &catalog, solution));
            }
        }
        None => {
            eprintln!("No solutions.bin found. Run 'hexpack solve' first.");
        }
    }
}

/// Prints the count of saved solutions.
fn run_count() {
    match persistence::count() {
        Some(count) => println!("{} solutions", count),
        None => eprintln!("No solutions.bin found. Run 'hexpack solve' first."),
    }
}

#[cfg(test)]
mod tests {
    use hexpack::board::{format_solution, Board};
    use hexpack::pieces::{Piece, PlacedPiece};
    use hexpack::{solve, SolveOptions};

    #[test]
    fn test_render_two_pieces_on_a_row() {
        let board = Board::rectangle(4, 1);
        let catalog = vec![
            Piece::new(0, vec![(0, 0), (1, 0)]),
            Piece::new(1, vec![(0, 0)]),
        ];
        let solution = vec![
            PlacedPiece {
                piece_id: 0,
                anchor: (0, 0),
                rotation: 0,
            },
            PlacedPiece {
                piece_id: 1,
                anchor: (3, 0),
                rotation: 0,
            },
        ];

        let text = format_solution(&board, &catalog, &solution);
        insta::assert_snapshot!(text.trim_end(), @"11.2");
    }

    #[test]
    fn test_solved_row_renders_fully_covered() {
        let board = Board::rectangle(3, 1);
        let catalog = vec![Piece::new(0, vec![(-1, 0), (0, 0), (1, 0)])];
        let summary = solve(
            &board,
            &catalog,
            SolveOptions {
                workers: Some(1),
                ..SolveOptions::default()
            },
        );

        assert_eq!(summary.best_coverage, 3);
        let text = format_solution(&board, &catalog, &summary.solutions[0]);
        insta::assert_snapshot!(text.trim_end(), @"111");
    }
}
