//! File I/O for saving and loading finished runs.
//!
//! Binary format for `solutions.bin` (little endian):
//! - u16: board width, u16: board height (odd-r rectangle dimensions)
//! - u16: best coverage
//! - u32: solution count
//! - repeat per solution:
//!   - u32: placement count
//!   - repeat per placement:
//!     - u32: piece id
//!     - i16: anchor q, i16: anchor r (axial)
//!     - u8: rotation step
//!
//! Loading replays placements through the same rotate-and-translate logic
//! the engine uses for canonical signatures, so a stored run renders exactly
//! as it was found.

use std::fs::File;
use std::io::{Read, Write};

use crate::board::{format_solution, Board};
use crate::pieces::{Piece, PlacedPiece, Solution};

const SOLUTIONS_BIN: &str = "solutions.bin";
const SOLUTIONS_TXT: &str = "solutions.txt";

/// A finished run as stored on disk.
pub struct SavedRun {
    pub width: u16,
    pub height: u16,
    pub coverage: u16,
    pub solutions: Vec<Solution>,
}

/// Saves a run to both binary and text files.
pub fn save(
    width: u16,
    height: u16,
    coverage: u16,
    catalog: &[Piece],
    solutions: &[Solution],
) -> std::io::Result<()> {
    save_text(width, height, coverage, catalog, solutions)?;
    save_binary(width, height, coverage, solutions)?;
    Ok(())
}

/// Saves solutions in human-readable text format.
fn save_text(
    width: u16,
    height: u16,
    coverage: u16,
    catalog: &[Piece],
    solutions: &[Solution],
) -> std::io::Result<()> {
    let board = Board::rectangle(width, height);
    let mut file = File::create(SOLUTIONS_TXT)?;
    writeln!(
        file,
        "{} solutions covering {} of {} cells:\n",
        solutions.len(),
        coverage,
        board.len()
    )?;
    for (i, solution) in solutions.iter().enumerate() {
        writeln!(file, "Solution {}:", i + 1)?;
        write!(file, "{}", format_solution(&board, catalog, solution))?;
        writeln!(file)?;
    }
    Ok(())
}

/// Saves solutions in compact binary format for fast loading.
fn save_binary(
    width: u16,
    height: u16,
    coverage: u16,
    solutions: &[Solution],
) -> std::io::Result<()> {
    let mut file = File::create(SOLUTIONS_BIN)?;

    file.write_all(&width.to_le_bytes())?;
    file.write_all(&height.to_le_bytes())?;
    file.write_all(&coverage.to_le_bytes())?;
    file.write_all(&(solutions.len() as u32).to_le_bytes())?;

    for solution in solutions {
        file.write_all(&(solution.len() as u32).to_le_bytes())?;
        for placed in solution {
            file.write_all(&placed.piece_id.to_le_bytes())?;
            file.write_all(&(placed.anchor.0 as i16).to_le_bytes())?;
            file.write_all(&(placed.anchor.1 as i16).to_le_bytes())?;
            file.write_all(&[placed.rotation])?;
        }
    }

    Ok(())
}

/// Loads a saved run from the binary file.
pub fn load() -> Option<SavedRun> {
    let mut file = File::open(SOLUTIONS_BIN).ok()?;

    let width = read_u16(&mut file)?;
    let height = read_u16(&mut file)?;
    let coverage = read_u16(&mut file)?;
    let solution_count = read_u32(&mut file)? as usize;

    let mut solutions = Vec::with_capacity(solution_count);
    for _ in 0..solution_count {
        let placement_count = read_u32(&mut file)? as usize;
        let mut solution = Vec::with_capacity(placement_count);
        for _ in 0..placement_count {
            let piece_id = read_u32(&mut file)?;
            let anchor_q = read_i16(&mut file)?;
            let anchor_r = read_i16(&mut file)?;
            let mut rotation = [0u8; 1];
            file.read_exact(&mut rotation).ok()?;
            solution.push(PlacedPiece {
                piece_id,
                anchor: (i32::from(anchor_q), i32::from(anchor_r)),
                rotation: rotation[0],
            });
        }
        solutions.push(solution);
    }

    Some(SavedRun {
        width,
        height,
        coverage,
        solutions,
    })
}

/// Returns the number of saved solutions without loading them all.
pub fn count() -> Option<usize> {
    let mut file = File::open(SOLUTIONS_BIN).ok()?;
    read_u16(&mut file)?;
    read_u16(&mut file)?;
    read_u16(&mut file)?;
    Some(read_u32(&mut file)? as usize)
}

fn read_u16(file: &mut File) -> Option<u16> {
    let mut buffer = [0u8; 2];
    file.read_exact(&mut buffer).ok()?;
    Some(u16::from_le_bytes(buffer))
}

fn read_i16(file: &mut File) -> Option<i16> {
    let mut buffer = [0u8; 2];
    file.read_exact(&mut buffer).ok()?;
    Some(i16::from_le_bytes(buffer))
}

fn read_u32(file: &mut File) -> Option<u32> {
    let mut buffer = [0u8; 4];
    file.read_exact(&mut buffer).ok()?;
    Some(u32::from_le_bytes(buffer))
}
