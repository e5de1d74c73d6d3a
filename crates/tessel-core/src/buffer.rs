//! Block-tiled primitive storage.
//!
//! A [`TiledBuffer`] is one contiguous allocation interpreted as `blocks_num`
//! blocks of `block_size` elements. Block boundaries always fall on row
//! boundaries' divisors, so any run of whole rows is a run of whole blocks and
//! sub-arrays can be borrowed by block arithmetic instead of copying.

use crate::dtype::Element;
use crate::error::TensorError;
use crate::Result;

/// Minimum block length the tiling aims for.
pub const MIN_BLOCK_SIZE: usize = 64;

/// Block length for a row of `row_len` elements.
///
/// The smallest divisor of `row_len` that is at least [`MIN_BLOCK_SIZE`];
/// rows shorter than that are a single block. Empty rows use 1.
pub fn block_size_for(row_len: usize) -> usize {
    if row_len <= MIN_BLOCK_SIZE {
        return row_len.max(1);
    }
    (MIN_BLOCK_SIZE..row_len)
        .find(|d| row_len % d == 0)
        .unwrap_or(row_len)
}

/// Fixed-size storage for `len` elements, split into equal contiguous blocks.
#[derive(Clone, PartialEq)]
pub struct TiledBuffer<T: Element> {
    data: Vec<T>,
    block_size: usize,
}

impl<T: Element> TiledBuffer<T> {
    /// Zero-filled buffer of `len` elements.
    pub fn zeros(len: usize, block_size: usize) -> Result<Self> {
        Self::from_vec(vec![T::default(); len], block_size)
    }

    /// Wrap `data` as blocks of `block_size` elements.
    pub fn from_vec(data: Vec<T>, block_size: usize) -> Result<Self> {
        if block_size == 0 || data.len() % block_size != 0 {
            return Err(TensorError::InvalidArgument(format!(
                "buffer of {} elements cannot be split into blocks of {}",
                data.len(),
                block_size
            )));
        }
        Ok(Self { data, block_size })
    }

    /// Tile `data` for rows of `row_len` elements. A length that is not a
    /// whole number of rows falls back to single-element blocks.
    pub(crate) fn for_rows(data: Vec<T>, row_len: usize) -> Self {
        let block = block_size_for(row_len);
        let block_size = if data.len() % block == 0 { block } else { 1 };
        Self { data, block_size }
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Elements per block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks.
    pub fn blocks_num(&self) -> usize {
        self.data.len() / self.block_size
    }

    /// Borrow block `i`.
    pub fn block(&self, i: usize) -> &[T] {
        &self.data[i * self.block_size..(i + 1) * self.block_size]
    }

    /// Mutably borrow block `i`.
    pub fn block_mut(&mut self, i: usize) -> &mut [T] {
        let bs = self.block_size;
        &mut self.data[i * bs..(i + 1) * bs]
    }

    /// Iterate over blocks in order.
    pub fn blocks(&self) -> std::slice::ChunksExact<'_, T> {
        self.data.chunks_exact(self.block_size)
    }

    /// Iterate mutably over blocks in order.
    pub fn blocks_mut(&mut self) -> std::slice::ChunksExactMut<'_, T> {
        self.data.chunks_exact_mut(self.block_size)
    }

    /// Borrow `count` consecutive blocks starting at block `start`.
    pub fn block_range(&self, start: usize, count: usize) -> &[T] {
        &self.data[start * self.block_size..(start + count) * self.block_size]
    }

    /// Mutably borrow `count` consecutive blocks starting at block `start`.
    pub fn block_range_mut(&mut self, start: usize, count: usize) -> &mut [T] {
        let bs = self.block_size;
        &mut self.data[start * bs..(start + count) * bs]
    }

    /// Linear iteration across block boundaries.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Re-partition the same elements into blocks of `block_size`.
    pub fn retile(self, block_size: usize) -> Result<Self> {
        Self::from_vec(self.data, block_size)
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Raw little-endian bytes of the buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

impl<T: Element> std::fmt::Debug for TiledBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiledBuffer")
            .field("dtype", &T::DTYPE)
            .field("len", &self.len())
            .field("block_size", &self.block_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_size_for() {
        assert_eq!(block_size_for(0), 1);
        assert_eq!(block_size_for(1), 1);
        assert_eq!(block_size_for(10), 10);
        assert_eq!(block_size_for(64), 64);
        assert_eq!(block_size_for(128), 64);
        assert_eq!(block_size_for(192), 64);
        assert_eq!(block_size_for(100), 100);
        assert_eq!(block_size_for(300), 75);
        assert_eq!(block_size_for(67), 67); // prime
    }

    #[test]
    fn test_blocks() {
        let buf = TiledBuffer::from_vec((0..12).collect::<Vec<i32>>(), 4).unwrap();
        assert_eq!(buf.blocks_num(), 3);
        assert_eq!(buf.block(1), &[4, 5, 6, 7]);
        assert_eq!(buf.block_range(1, 2), &[4, 5, 6, 7, 8, 9, 10, 11]);
        assert_eq!(buf.blocks().count(), 3);
        assert_eq!(buf.iter().copied().sum::<i32>(), 66);
    }

    #[test]
    fn test_block_mut() {
        let mut buf = TiledBuffer::<f32>::zeros(8, 4).unwrap();
        buf.block_mut(1)[0] = 5.0;
        for b in buf.blocks_mut() {
            b[1] = 1.0;
        }
        assert_eq!(buf.as_slice(), &[0.0, 1.0, 0.0, 0.0, 5.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_invalid_block_size() {
        assert!(TiledBuffer::from_vec(vec![0u8; 10], 4).is_err());
        assert!(TiledBuffer::from_vec(vec![0u8; 10], 0).is_err());
        assert!(TiledBuffer::from_vec(Vec::<u8>::new(), 1).is_ok());
    }

    #[test]
    fn test_retile_keeps_order() {
        let buf = TiledBuffer::from_vec((0..6).collect::<Vec<i64>>(), 3).unwrap();
        let buf = buf.retile(2).unwrap();
        assert_eq!(buf.blocks_num(), 3);
        assert_eq!(buf.block(2), &[4, 5]);
    }

    #[test]
    fn test_clone_duplicates() {
        let a = TiledBuffer::from_vec(vec![1u8, 2, 3], 3).unwrap();
        let mut b = a.clone();
        b.block_mut(0)[0] = 9;
        assert_eq!(a.as_slice(), &[1, 2, 3]);
        assert_eq!(b.as_slice(), &[9, 2, 3]);
    }
}
