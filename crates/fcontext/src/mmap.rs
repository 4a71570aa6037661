//! Memory-mapped region pool
//!
//! Rule entries loaded from a compiled file borrow their pattern and stem
//! bytes straight out of the mapping. The pool owns every mapping for the
//! lifetime of the handle; nothing is unmapped until the handle is dropped,
//! after the borrowing entries are already gone.

use memmap2::Mmap;
use std::fs::File;
use std::io;

/// Byte storage that is either owned or borrowed from a mapped region.
///
/// The borrowed variant replaces the original's per-entity `from_mmap` flag:
/// the tag says who frees the bytes. `Mmap` slices point into a region held
/// by the same handle's [`MmapPool`] and are dropped before the pool is.
#[derive(Debug)]
pub(crate) enum Bytes {
    Owned(Box<[u8]>),
    Mmap(&'static [u8]),
}

impl Bytes {
    pub(crate) fn as_slice(&self) -> &[u8] {
        match self {
            Bytes::Owned(b) => b,
            Bytes::Mmap(b) => b,
        }
    }
}

impl PartialEq for Bytes {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Bytes {}

/// Owner of every mapping backing borrowed `Bytes::Mmap` slices.
#[derive(Debug, Default)]
pub(crate) struct MmapPool {
    regions: Vec<Mmap>,
}

impl MmapPool {
    /// Map `file` read-only and return a slice valid for the pool's lifetime.
    ///
    /// The `'static` lifetime is a promise kept by the handle: the pool is
    /// append-only, the `Mmap` owns pages whose address never changes when
    /// the pool vector reallocates or the handle moves, and the pool is the
    /// last field of the handle to drop.
    pub(crate) fn map(&mut self, file: &File) -> io::Result<&'static [u8]> {
        // SAFETY: the file is opened read-only and the mapping is private;
        // the slice is handed out only to entries owned by the same handle.
        let region = unsafe { Mmap::map(file)? };
        let slice: &'static [u8] =
            unsafe { std::slice::from_raw_parts(region.as_ptr(), region.len()) };
        self.regions.push(region);
        Ok(slice)
    }

    #[cfg(test)]
    pub(crate) fn region_count(&self) -> usize {
        self.regions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn mapped_bytes_match_file_contents() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"stem and pattern bytes").unwrap();
        tmp.flush().unwrap();

        let mut pool = MmapPool::default();
        let slice = pool.map(tmp.as_file()).unwrap();
        assert_eq!(slice, b"stem and pattern bytes");
        assert_eq!(pool.region_count(), 1);
    }

    #[test]
    fn owned_and_mapped_bytes_compare_by_content() {
        let owned = Bytes::Owned(b"/usr".to_vec().into_boxed_slice());
        let leaked: &'static [u8] = Box::leak(b"/usr".to_vec().into_boxed_slice());
        assert_eq!(owned, Bytes::Mmap(leaked));
    }
}
