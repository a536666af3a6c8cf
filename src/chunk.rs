//! Splitting id lists into bounded batches.

use crate::error::ConfigurationError;

/// Default number of ids bound into a single `IN (...)` list.
pub const DEFAULT_CHUNK_SIZE: usize = 25;

/// Split `ids` into consecutive chunks of at most `size` elements.
///
/// Order is preserved within and across chunks, so concatenating the result
/// reproduces `ids`. An empty input yields no chunks at all.
///
/// # Errors
///
/// Returns [`ConfigurationError::InvalidChunkSize`] when `size` is zero.
///
/// # Example
///
/// ```
/// use bookshelf::chunk;
///
/// let parts = chunk(&[1, 2, 3, 4, 5], 2).unwrap();
/// assert_eq!(parts, vec![vec![1, 2], vec![3, 4], vec![5]]);
/// assert!(chunk::<i64>(&[], 25).unwrap().is_empty());
/// ```
pub fn chunk<T: Clone>(ids: &[T], size: usize) -> Result<Vec<Vec<T>>, ConfigurationError> {
    if size == 0 {
        return Err(ConfigurationError::InvalidChunkSize(size));
    }
    Ok(ids.chunks(size).map(<[T]>::to_vec).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_chunk_sixty_ids_by_default_size() {
        let ids: Vec<i64> = (1..=60).collect();
        let parts = chunk(&ids, DEFAULT_CHUNK_SIZE).unwrap();
        let sizes: Vec<usize> = parts.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![25, 25, 10]);
    }

    #[test]
    fn test_chunk_empty_input_yields_no_chunks() {
        let parts = chunk::<i64>(&[], 3).unwrap();
        assert!(parts.is_empty());
    }

    #[test]
    fn test_chunk_exact_multiple() {
        let parts = chunk(&[1i64, 2, 3, 4], 2).unwrap();
        assert_eq!(parts, vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_chunk_zero_size_is_rejected() {
        let err = chunk(&[1i64], 0).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidChunkSize(0)));
    }

    proptest! {
        #[test]
        fn prop_chunk_concatenation_reproduces_input(
            ids in proptest::collection::vec(any::<i64>(), 0..200),
            size in 1usize..40,
        ) {
            let parts = chunk(&ids, size).unwrap();
            let flattened: Vec<i64> = parts.iter().flatten().copied().collect();
            prop_assert_eq!(flattened, ids.clone());
            prop_assert!(parts.iter().all(|p| !p.is_empty() && p.len() <= size));
            prop_assert_eq!(parts.len(), ids.len().div_ceil(size));
        }
    }
}
