//! Fixed-size partitioning of an ordered identifier list into shards

use std::num::NonZeroUsize;

/// One contiguous slice of the input together with its output index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shard<'a, T> {
    /// Output file index (`<index>.json`)
    pub index: usize,
    pub items: &'a [T],
}

impl<T> Shard<'_, T> {
    /// Shift the index so a later pass continues an earlier numbering.
    pub fn offset(self, base: usize) -> Self {
        Self {
            index: self.index + base,
            ..self
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Split `items` into `shard_size` chunks; the last chunk may be shorter.
pub fn partition<T>(items: &[T], shard_size: NonZeroUsize) -> Vec<Shard<'_, T>> {
    items
        .chunks(shard_size.get())
        .enumerate()
        .map(|(index, items)| Shard { index, items })
        .collect()
}

/// Number of shards [`partition`] yields for `len` items.
pub fn shard_count(len: usize, shard_size: NonZeroUsize) -> usize {
    len.div_ceil(shard_size.get())
}
