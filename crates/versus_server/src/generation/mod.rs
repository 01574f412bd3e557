//! Board generation shared by both stack generators.
//!
//! Boards are six columns wide and travel as flat, row-major cell buffers:
//! the cell directly above index `i` lives at `i - COLUMNS`. A cell holds a
//! color digit, [`EMPTY`] or [`METAL`].

pub mod garbage;
pub mod panels;

pub use garbage::generate_garbage;
pub use panels::{cut_board, OpeningRows, PanelBatch, PanelGenerator};

use crate::error::ServerError;
use rand::seq::SliceRandom;
use rand::Rng;

/// Board width in cells.
pub const COLUMNS: usize = 6;

/// A cleared cell.
pub const EMPTY: u8 = 0;

/// The non-matchable metal panel.
pub const METAL: u8 = 8;

/// One board row, leftmost column first.
pub type Row = [u8; COLUMNS];

/// The seed row clients send to ask for a fresh game.
pub const RESET_ROW: Row = [EMPTY; COLUMNS];

/// Number of distinct panel colors in play, always within `2..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorCount(u8);

impl ColorCount {
    pub const MIN: u8 = 2;
    pub const MAX: u8 = 9;

    pub fn new(count: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&count).then_some(Self(count))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// A decoded panel or garbage request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRequest {
    pub colors: ColorCount,
    /// The requester's current bottom row
    pub seed: Row,
}

impl StackRequest {
    /// Parses a 7-byte request payload: one color-count digit followed by
    /// six seed-row digits.
    ///
    /// Returns `Ok(None)` for a color count below two, which clients use to
    /// mean "nothing to generate" and which gets no reply.
    pub fn parse(payload: &[u8]) -> Result<Option<Self>, ServerError> {
        let [count, seed @ ..] = payload else {
            return Err(ServerError::InvalidRequest("empty request".to_string()));
        };
        if seed.len() != COLUMNS {
            return Err(ServerError::InvalidRequest(format!(
                "seed row has {} cells, expected {COLUMNS}",
                seed.len()
            )));
        }

        let count = digit(*count)?;
        let Some(colors) = ColorCount::new(count) else {
            return Ok(None);
        };

        let mut row = RESET_ROW;
        for (cell, byte) in row.iter_mut().zip(seed) {
            *cell = digit(*byte)?;
        }

        Ok(Some(Self { colors, seed: row }))
    }

    /// An all-empty seed row marks a new game or rematch.
    pub fn is_reset(&self) -> bool {
        self.seed == RESET_ROW
    }
}

fn digit(byte: u8) -> Result<u8, ServerError> {
    if byte.is_ascii_digit() {
        Ok(byte - b'0')
    } else {
        Err(ServerError::InvalidRequest(format!(
            "expected a digit, got 0x{byte:02x}"
        )))
    }
}

/// Renders cells as the digit string used on the wire.
pub fn encode_cells(cells: &[u8]) -> String {
    cells.iter().map(|cell| char::from(b'0' + cell)).collect()
}

/// Draws a color uniformly from `1..=colors` among those `allowed` accepts.
///
/// Equivalent in distribution to drawing and redrawing on rejection, but
/// always terminates.
fn draw_color<R, F>(rng: &mut R, colors: ColorCount, allowed: F) -> Option<u8>
where
    R: Rng + ?Sized,
    F: Fn(u8) -> bool,
{
    let candidates: Vec<u8> = (1..=colors.get()).filter(|&c| allowed(c)).collect();
    candidates.choose(rng).copied()
}
