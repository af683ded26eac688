//! Row-parallel helpers shared by the per-pixel stages.

use rayon::prelude::*;

/// Multiplier for number of chunks relative to worker threads.
const CHUNKS_PER_THREAD: usize = 2;

/// Images smaller than this many pixels are processed on the calling thread.
const MIN_PARALLEL_PIXELS: usize = 16 * 1024;

/// Rows per chunk so that the image splits into roughly `threads * 2` static chunks.
#[inline]
pub fn rows_per_chunk(height: usize) -> usize {
    let num_chunks = rayon::current_num_threads() * CHUNKS_PER_THREAD;
    (height / num_chunks).max(1)
}

/// Runs `f(row_index, row)` over every row of a row-major buffer.
///
/// Rows are independent: `f` must not depend on the order in which rows are visited.
pub fn for_each_row<T, F>(data: &mut [T], width: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    if width == 0 || data.is_empty() {
        return;
    }
    let height = data.len() / width;
    if data.len() < MIN_PARALLEL_PIXELS {
        for (y, row) in data.chunks_mut(width).enumerate() {
            f(y, row);
        }
        return;
    }

    let rows = rows_per_chunk(height);
    data.par_chunks_mut(rows * width)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            for (i, row) in chunk.chunks_mut(width).enumerate() {
                f(chunk_idx * rows + i, row);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_each_row_visits_every_row_once() {
        let width = 7;
        let height = 5000;
        let mut data = vec![0usize; width * height];
        for_each_row(&mut data, width, |y, row| {
            for (x, v) in row.iter_mut().enumerate() {
                *v += y * width + x;
            }
        });
        for (i, &v) in data.iter().enumerate() {
            assert_eq!(v, i);
        }
    }

    #[test]
    fn test_for_each_row_empty() {
        let mut data: Vec<u16> = vec![];
        for_each_row(&mut data, 4, |_, _| panic!("no rows expected"));
        assert!(data.is_empty());
    }

    #[test]
    fn test_rows_per_chunk_minimum() {
        assert_eq!(rows_per_chunk(0), 1);
        assert!(rows_per_chunk(100_000) >= 1);
    }
}
