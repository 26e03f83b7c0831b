//! Fixed-size sequence batching
//!
//! The attendance engine bounds its in-flight request count by splitting a
//! character list into fixed-size chunks and running one chunk at a time.

/// Split an ordered list into chunks of at most `size` elements.
///
/// Produces `ceil(n / size)` chunks; input order is preserved within and
/// across chunks. `size` must be positive.
pub fn chunked<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    assert!(size > 0, "chunk size must be positive");

    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(items.len()));

    for item in items {
        current.push(item);
        if current.len() == size {
            chunks.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
