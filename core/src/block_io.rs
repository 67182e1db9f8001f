//! Read-only `gpt_disk_io::BlockIo` view over a registered RAM disk.
//!
//! Reads go straight to the memory the RAM disk service was given, so this
//! sees exactly what the firmware's block device sees.

use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};
use thiserror::Error;

/// Error type for RAM disk block reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RamDiskIoError {
    /// Buffer length is not a multiple of the block size
    #[error("buffer is not a whole number of blocks")]
    UnalignedBuffer,
    /// Read past the last block
    #[error("read beyond end of RAM disk")]
    OutOfRange,
    /// Image memory is immutable
    #[error("RAM disk image is read-only")]
    ReadOnly,
}

/// Block device view of an in-memory image.
pub struct RamDiskBlockIo<'a> {
    image: &'a [u8],
    block_size: BlockSize,
    block_bytes: usize,
}

impl<'a> RamDiskBlockIo<'a> {
    /// `block_bytes` must be a power of two of at least 512.
    pub fn new(image: &'a [u8], block_bytes: u32) -> Self {
        let (block_size, block_bytes) = match BlockSize::new(block_bytes) {
            Some(size) => (size, block_bytes as usize),
            None => (BlockSize::BS_512, 512),
        };
        Self {
            image,
            block_size,
            block_bytes,
        }
    }

    pub fn block_size_bytes(&self) -> usize {
        self.block_bytes
    }

    /// Blocks needed to cover the image (last block may be partial).
    pub fn total_blocks(&self) -> u64 {
        self.image.len().div_ceil(self.block_bytes) as u64
    }

    /// Image size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.image.len() as u64
    }
}

impl BlockIo for RamDiskBlockIo<'_> {
    type Error = RamDiskIoError;

    fn block_size(&self) -> BlockSize {
        self.block_size
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok(self.total_blocks())
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        if dst.len() % self.block_bytes != 0 {
            return Err(RamDiskIoError::UnalignedBuffer);
        }
        let count = (dst.len() / self.block_bytes) as u64;
        let end_lba = start_lba.0.checked_add(count).ok_or(RamDiskIoError::OutOfRange)?;
        if end_lba > self.total_blocks() {
            return Err(RamDiskIoError::OutOfRange);
        }

        if dst.is_empty() {
            return Ok(());
        }

        let start = start_lba.0 as usize * self.block_bytes;
        let src = self.image.get(start..).unwrap_or(&[]);
        let available = src.len().min(dst.len());
        dst[..available].copy_from_slice(&src[..available]);
        // Tail of a partial last block
        dst[available..].fill(0);
        Ok(())
    }

    fn write_blocks(&mut self, _start_lba: Lba, _src: &[u8]) -> Result<(), Self::Error> {
        Err(RamDiskIoError::ReadOnly)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn partial_last_block_is_zero_padded() {
        let image = vec![0xAAu8; 2048 + 100];
        let mut io = RamDiskBlockIo::new(&image, 2048);
        assert_eq!(io.num_blocks().unwrap(), 2);

        let mut block = vec![0xFFu8; 2048];
        io.read_blocks(Lba(1), &mut block).unwrap();
        assert!(block[..100].iter().all(|&b| b == 0xAA));
        assert!(block[100..].iter().all(|&b| b == 0));
    }

    #[test]
    fn reads_past_end_fail() {
        let image = vec![0u8; 1024];
        let mut io = RamDiskBlockIo::new(&image, 512);
        let mut block = vec![0u8; 512];
        assert_eq!(io.read_blocks(Lba(2), &mut block), Err(RamDiskIoError::OutOfRange));
        assert_eq!(io.read_blocks(Lba(0), &mut block[..100]), Err(RamDiskIoError::UnalignedBuffer));
    }

    #[test]
    fn empty_read_at_end_of_partial_image() {
        let image = vec![0x55u8; 2048 + 100];
        let mut io = RamDiskBlockIo::new(&image, 2048);
        assert_eq!(io.num_blocks().unwrap(), 2);

        let mut empty: [u8; 0] = [];
        assert_eq!(io.read_blocks(Lba(2), &mut empty), Ok(()));
        assert_eq!(io.read_blocks(Lba(3), &mut empty), Err(RamDiskIoError::OutOfRange));
    }

    #[test]
    fn writes_are_rejected() {
        let image = vec![0u8; 512];
        let mut io = RamDiskBlockIo::new(&image, 512);
        assert_eq!(io.write_blocks(Lba(0), &[0u8; 512]), Err(RamDiskIoError::ReadOnly));
    }
}
