//! Panel stack generation.
//!
//! Each connection owns one [`PanelGenerator`]. It extends the requester's
//! board with fresh rows that cannot match immediately: no cell repeats the
//! color directly above it, and no row contains three equal cells in a row.
//! In versus mode the generator alternates between plain phases and metal
//! phases, during which every row carries exactly one metal panel whose column
//! differs from the previous row's.
//!
//! A reset request (all-empty seed row) either reuses the opening layout the
//! opponent's generator handed over, or produces a fresh layout and cuts it
//! into a ragged starting stack with [`cut_board`]. The first
//! [`OPENING_ROWS`] rows of a cut board travel to the opponent so both players
//! of a rematch start from the same board.

use super::{draw_color, ColorCount, Row, StackRequest, COLUMNS, EMPTY, METAL};
use crate::error::ServerError;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

/// Rows in the working buffer once generation finishes, seed row included.
pub const STACK_ROWS: usize = 21;

/// Rows handed to the opponent after a cut, seed row included.
pub const OPENING_ROWS: usize = 8;

/// Height of the stack the cut starts from.
pub const CUT_HEIGHT: usize = 7;

/// Cells cleared by a cut.
pub const CUT_CELLS: usize = 12;

/// Rows a reused opening layout counts against the phase countdown.
const REUSED_ROWS: u32 = 7;

/// Attempts at a fully constrained row before the same-row rule is relaxed.
const ROW_ATTEMPTS: usize = 32;

/// Opening layout cached for the opponent's next reset request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningRows {
    colors: ColorCount,
    cells: Vec<u8>,
}

impl OpeningRows {
    /// Takes the first [`OPENING_ROWS`] rows of `cells`.
    fn from_board(colors: ColorCount, cells: &[u8]) -> Self {
        Self {
            colors,
            cells: cells[..OPENING_ROWS * COLUMNS].to_vec(),
        }
    }

    /// Color count the layout was generated with.
    pub fn colors(&self) -> ColorCount {
        self.colors
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }
}

/// Result of one panel request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelBatch {
    /// Generated rows with the seed row dropped, row-major
    pub cells: Vec<u8>,
    /// Present when this request cut a fresh board; destined for the neighbor
    pub opening_rows: Option<OpeningRows>,
}

/// Per-connection panel generation state.
#[derive(Debug, Clone)]
pub struct PanelGenerator {
    versus_mode: bool,
    metal_active: bool,
    rows_until_phase_change: u32,
    prev_metal_column: Option<usize>,
}

impl PanelGenerator {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            versus_mode: false,
            metal_active: false,
            rows_until_phase_change: rng.gen_range(15..=22),
            prev_metal_column: None,
        }
    }

    pub fn versus_mode(&self) -> bool {
        self.versus_mode
    }

    /// Enables metal phase cycling. Irreversible for the connection.
    pub fn enter_versus_mode(&mut self) {
        self.versus_mode = true;
    }

    pub fn metal_active(&self) -> bool {
        self.metal_active
    }

    pub fn rows_until_phase_change(&self) -> u32 {
        self.rows_until_phase_change
    }

    /// Serves one panel request.
    ///
    /// `cached` is the opening layout the neighbor left for this connection,
    /// if any. It is only considered for reset requests and only reused when
    /// its color count matches the request.
    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        request: &StackRequest,
        cached: Option<OpeningRows>,
    ) -> Result<PanelBatch, ServerError> {
        let mut cells: Vec<u8> = request.seed.to_vec();
        let mut cut = false;

        if request.is_reset() {
            match cached.filter(|opening| opening.colors == request.colors) {
                Some(opening) => {
                    debug!("♻️ Reusing opening layout from opponent's cut");
                    cells = opening.cells;
                    self.advance_countdown(REUSED_ROWS, rng);
                }
                None => cut = true,
            }
        }

        cells.reserve(STACK_ROWS * COLUMNS - cells.len());
        while cells.len() < STACK_ROWS * COLUMNS {
            self.push_row(rng, &mut cells, request.colors)?;
        }

        let opening_rows = if cut {
            cut_board(rng, &mut cells);
            Some(OpeningRows::from_board(request.colors, &cells))
        } else {
            None
        };

        cells.drain(..COLUMNS);
        Ok(PanelBatch {
            cells,
            opening_rows,
        })
    }

    fn push_row<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        cells: &mut Vec<u8>,
        colors: ColorCount,
    ) -> Result<(), ServerError> {
        let mut above: Row = [EMPTY; COLUMNS];
        above.copy_from_slice(&cells[cells.len() - COLUMNS..]);

        let metal_columns = if self.metal_active {
            self.metal_candidates(&above)
        } else {
            Vec::new()
        };

        let (row, metal_column) = fill_row(rng, &above, &metal_columns, colors)?;
        cells.extend_from_slice(&row);

        self.prev_metal_column = metal_column;
        self.advance_countdown(1, rng);
        Ok(())
    }

    /// Columns this row's metal panel may take: never the previous row's,
    /// and never under a metal cell already on the board.
    fn metal_candidates(&self, above: &Row) -> Vec<usize> {
        (0..COLUMNS)
            .filter(|&column| Some(column) != self.prev_metal_column && above[column] != METAL)
            .collect()
    }

    /// Counts `rows` against the phase countdown, switching phase on zero.
    fn advance_countdown<R: Rng + ?Sized>(&mut self, rows: u32, rng: &mut R) {
        self.rows_until_phase_change = self.rows_until_phase_change.saturating_sub(rows);
        if self.rows_until_phase_change > 0 {
            return;
        }

        if self.versus_mode {
            self.metal_active = !self.metal_active;
            debug!(
                "🔩 Metal phase {}",
                if self.metal_active { "started" } else { "ended" }
            );
        }
        self.rows_until_phase_change = if self.metal_active {
            rng.gen_range(1..=4)
        } else {
            rng.gen_range(1..=8)
        };
    }
}

/// Generates one row under `above`, returning it with the column its metal
/// panel landed in. An empty `metal_columns` means a row without metal.
///
/// With two colors a row can paint itself into a corner. Each of the
/// [`ROW_ATTEMPTS`] random attempts draws a new metal column; after that every
/// metal column and color is searched, and the same-row rule is only dropped
/// when no row satisfies it at all.
fn fill_row<R: Rng + ?Sized>(
    rng: &mut R,
    above: &Row,
    metal_columns: &[usize],
    colors: ColorCount,
) -> Result<(Row, Option<usize>), ServerError> {
    for _ in 0..ROW_ATTEMPTS {
        let metal_column = metal_columns.choose(rng).copied();
        if let Some(row) = try_fill_row(rng, above, metal_column, colors, true) {
            return Ok((row, metal_column));
        }
    }

    let mut placements: Vec<Option<usize>> = metal_columns.iter().copied().map(Some).collect();
    placements.shuffle(rng);
    if placements.is_empty() {
        placements.push(None);
    }

    for &metal_column in &placements {
        let mut row: Row = [EMPTY; COLUMNS];
        if search_row(rng, above, metal_column, colors, &mut row, 0) {
            return Ok((row, metal_column));
        }
    }

    warn!(
        "⚠️ No row without a horizontal run fits under {:?} with {} colors",
        above,
        colors.get()
    );
    let metal_column = placements[0];
    try_fill_row(rng, above, metal_column, colors, false)
        .map(|row| (row, metal_column))
        .ok_or_else(|| ServerError::Internal(format!("no row fits under {above:?}")))
}

fn try_fill_row<R: Rng + ?Sized>(
    rng: &mut R,
    above: &Row,
    metal_column: Option<usize>,
    colors: ColorCount,
    forbid_runs: bool,
) -> Option<Row> {
    let mut row: Row = [EMPTY; COLUMNS];
    for column in 0..COLUMNS {
        let run_color = if forbid_runs {
            forbidden_run_color(&row, column)
        } else {
            None
        };

        if Some(column) == metal_column {
            // Colors 8 and 9 can put a plain 8 pair in front of the metal.
            if run_color == Some(METAL) {
                return None;
            }
            row[column] = METAL;
            continue;
        }

        row[column] = draw_color(rng, colors, |color| {
            color != above[column] && Some(color) != run_color
        })?;
    }
    Some(row)
}

/// Depth-first search for a fully constrained row, filling `row` from
/// `column` onwards. Colors are tried in random order.
fn search_row<R: Rng + ?Sized>(
    rng: &mut R,
    above: &Row,
    metal_column: Option<usize>,
    colors: ColorCount,
    row: &mut Row,
    column: usize,
) -> bool {
    if column == COLUMNS {
        return true;
    }

    let run_color = forbidden_run_color(row, column);
    if Some(column) == metal_column {
        if run_color == Some(METAL) {
            return false;
        }
        row[column] = METAL;
        return search_row(rng, above, metal_column, colors, row, column + 1);
    }

    let mut candidates: Vec<u8> = (1..=colors.get())
        .filter(|&color| color != above[column] && Some(color) != run_color)
        .collect();
    candidates.shuffle(rng);
    for color in candidates {
        row[column] = color;
        if search_row(rng, above, metal_column, colors, row, column + 1) {
            return true;
        }
    }
    false
}

/// The color a cell at `column` must avoid to keep the row free of three
/// equal cells in a row.
fn forbidden_run_color(row: &Row, column: usize) -> Option<u8> {
    (column >= 2 && row[column - 1] == row[column - 2]).then(|| row[column - 1])
}

/// Clears [`CUT_CELLS`] cells from the top of the [`CUT_HEIGHT`]-row stack
/// sitting under the seed row, one random column at a time.
///
/// `cells` must hold at least `CUT_HEIGHT + 1` rows.
pub fn cut_board<R: Rng + ?Sized>(rng: &mut R, cells: &mut [u8]) {
    let mut heights = [CUT_HEIGHT; COLUMNS];
    for _ in 0..CUT_CELLS {
        let standing: Vec<usize> = (0..COLUMNS).filter(|&c| heights[c] > 0).collect();
        let Some(&column) = standing.choose(rng) else {
            return;
        };

        // Height 7 is buffer row 1, the first row under the seed.
        let row = CUT_HEIGHT + 1 - heights[column];
        cells[row * COLUMNS + column] = EMPTY;
        heights[column] -= 1;
    }
}
