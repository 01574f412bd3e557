//! Garbage block color generation.
//!
//! Garbage only has to avoid repeating the color directly above each cell.
//! Same-row repeats are fine because garbage blocks do not form matches
//! until they are broken up.

use super::{draw_color, encode_cells, StackRequest, COLUMNS};
use crate::error::ServerError;
use rand::Rng;

/// Garbage rows generated per request.
pub const GARBAGE_ROWS: usize = 20;

/// Generates [`GARBAGE_ROWS`] rows under the request's seed row and returns
/// them as a wire digit string, seed row excluded.
pub fn generate_garbage<R: Rng + ?Sized>(
    rng: &mut R,
    request: &StackRequest,
) -> Result<String, ServerError> {
    let mut cells: Vec<u8> = Vec::with_capacity((GARBAGE_ROWS + 1) * COLUMNS);
    cells.extend_from_slice(&request.seed);

    for _ in 0..GARBAGE_ROWS * COLUMNS {
        let above = cells[cells.len() - COLUMNS];
        let color = draw_color(rng, request.colors, |color| color != above).ok_or_else(|| {
            ServerError::Internal(format!(
                "no garbage color fits under {above} with {} colors",
                request.colors.get()
            ))
        })?;
        cells.push(color);
    }

    Ok(encode_cells(&cells[COLUMNS..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{ColorCount, Row, EMPTY};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn request(colors: u8, seed: Row) -> StackRequest {
        StackRequest {
            colors: ColorCount::new(colors).unwrap(),
            seed,
        }
    }

    fn digits(encoded: &str) -> Vec<u8> {
        encoded.bytes().map(|b| b - b'0').collect()
    }

    #[test]
    fn test_garbage_shape_and_vertical_rule() {
        let seed: Row = [1, 2, 2, 1, 2, 1];
        for colors in 2..=9 {
            for stream in 0..20 {
                let mut rng = ChaCha8Rng::seed_from_u64(stream);
                let encoded = generate_garbage(&mut rng, &request(colors, seed)).unwrap();
                assert_eq!(encoded.len(), GARBAGE_ROWS * COLUMNS);

                let mut board = seed.to_vec();
                board.extend(digits(&encoded));
                for i in COLUMNS..board.len() {
                    assert_ne!(board[i], board[i - COLUMNS], "vertical repeat at {i}");
                    assert!((1..=colors).contains(&board[i]));
                }
            }
        }
    }

    #[test]
    fn test_same_row_repeats_allowed() {
        // With two colors and an all-empty seed, rows beyond the first are the
        // complement of the row above, so some row will repeat horizontally.
        let mut saw_repeat = false;
        for stream in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(stream);
            let encoded = generate_garbage(&mut rng, &request(2, [EMPTY; COLUMNS])).unwrap();
            let cells = digits(&encoded);
            saw_repeat |= cells
                .chunks(COLUMNS)
                .any(|row| row.windows(2).any(|pair| pair[0] == pair[1]));
        }
        assert!(saw_repeat);
    }
}
