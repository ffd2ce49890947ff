//! Halving a batch that the endpoint rejected as too large.

use super::Batch;

/// Upper bound on split depth. Fragment size strictly halves, so a batch
/// addressable by `usize` can never legitimately exceed this.
pub const MAX_SPLIT_DEPTH: u32 = usize::BITS;

/// Splits `batch` into two contiguous fragments of `ceil(k/2)` and `floor(k/2)`
/// points.
///
/// Both fragments keep the parent's shared attributes, get fresh ids and link
/// back to the parent. Point order is preserved. Returns `None` when the batch
/// has fewer than two points or has reached `MAX_SPLIT_DEPTH`.
pub fn split(batch: &Batch) -> Option<(Batch, Batch)> {
    let k = batch.len();
    if k < 2 || batch.depth() >= MAX_SPLIT_DEPTH {
        return None;
    }
    let (start, end) = batch.span();
    let mid = start + k.div_ceil(2);
    Some((
        Batch::fragment(batch, start, mid),
        Batch::fragment(batch, mid, end),
    ))
}
