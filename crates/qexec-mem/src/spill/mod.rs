//! Spill store for the disk-bounded operators.
//!
//! A *run* is an append-only sequence of pages written to one storage object.
//! Each page is framed as a segment (see `segment`) and checksummed; the
//! per-page offsets and checksums live in the `RunHandle` held by the
//! operator that owns the run.

pub mod codec;
pub mod run;
pub mod segment;

use std::sync::Arc;

use qexec_core::batch::Batch;
use qexec_core::id::SpillId;

use crate::error::{Error, Result};

pub use codec::Codec;
pub use run::{PageMeta, RunHandle, RunReader};
pub use segment::{SegmentHeader, HEADER_LEN};

/// Abstract byte storage for runs.
///
/// Implemented by `qexec-io::FsStorage` for the local filesystem and by
/// `qexec-io::MemoryStorage` for tests.
pub trait Storage: Send + Sync {
    /// Write bytes to a path, replacing any previous content. Creates parent
    /// directories if needed.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Append bytes to the end of a path, creating it if missing.
    fn append(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read a byte range from a path. Returns exactly `len` bytes or error.
    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Delete a path. Idempotent (no error if path doesn't exist).
    fn delete(&self, path: &str) -> Result<()>;

    /// List all paths under a prefix.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Size of a path in bytes.
    fn size(&self, path: &str) -> Result<u64>;
}

/// Writes and reads pages of runs through a `Storage` backend.
///
/// Shared between operators behind an `Arc`. The manager itself holds no
/// per-run state, so concurrent operators only contend inside the backend.
pub struct SpillManager {
    storage: Arc<dyn Storage>,
    codec: Codec,
    root_dir: String,
}

impl SpillManager {
    pub fn new(storage: Arc<dyn Storage>, codec: Codec, root_dir: impl Into<String>) -> Self {
        Self {
            storage,
            codec,
            root_dir: root_dir.into(),
        }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn root_dir(&self) -> &str {
        &self.root_dir
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Create an empty run. `prefix` names the owning operator in the path so
    /// leftover files can be traced back to it.
    pub fn create_run(&self, prefix: &str) -> Result<RunHandle> {
        let id = SpillId::next();
        let path = format!("{}/{}-{}.run", self.root_dir, prefix, id.get());
        self.storage.write(&path, &[])?;
        tracing::trace!(run = %path, "created run");
        Ok(RunHandle::new(id, path))
    }

    /// Append one page to the end of `run`.
    ///
    /// Steps:
    /// 1. Serialize the page with serde_json
    /// 2. Compress the payload with the configured codec
    /// 3. Frame it with a `SegmentHeader`
    /// 4. Checksum (header || payload) with blake3
    /// 5. Append to storage and record the page metadata in the handle
    pub fn append_page(&self, run: &mut RunHandle, page: &Batch) -> Result<()> {
        let uncompressed =
            serde_json::to_vec(page).map_err(|e| Error::Codec(format!("json serialize: {e}")))?;
        let compressed = codec::compress(self.codec, &uncompressed)?;

        let header = SegmentHeader::new(
            self.codec,
            uncompressed.len() as u64,
            compressed.len() as u64,
        );
        let mut segment = Vec::with_capacity(HEADER_LEN + compressed.len());
        segment.extend_from_slice(&header.to_bytes());
        segment.extend_from_slice(&compressed);
        let checksum: [u8; 32] = blake3::hash(&segment).into();

        self.storage.append(run.path(), &segment)?;
        run.push_page(PageMeta {
            offset: run.bytes(),
            len: segment.len() as u64,
            tuples: page.len(),
            checksum,
        });
        Ok(())
    }

    /// Read page `index` of `run`, verifying its checksum.
    pub fn read_page(&self, run: &RunHandle, index: usize) -> Result<Batch> {
        let meta = run.page(index).ok_or_else(|| Error::PageOutOfRange {
            run: run.path().to_string(),
            index,
            pages: run.num_pages(),
        })?;

        let segment = self
            .storage
            .read_range(run.path(), meta.offset, meta.len as usize)?;
        if segment.len() != meta.len as usize {
            return Err(Error::Storage(format!(
                "short read of page {index} in {}",
                run.path()
            )));
        }
        let computed: [u8; 32] = blake3::hash(&segment).into();
        if computed != meta.checksum {
            return Err(Error::ChecksumMismatch(format!(
                "page {index} of {}",
                run.path()
            )));
        }

        let header = SegmentHeader::from_bytes(&segment[..HEADER_LEN])?;
        let uncompressed = codec::decompress(header.codec, &segment[HEADER_LEN..])?;
        if uncompressed.len() as u64 != header.uncompressed_len {
            return Err(Error::Codec(format!(
                "page {index} of {} decoded to {} bytes, header says {}",
                run.path(),
                uncompressed.len(),
                header.uncompressed_len
            )));
        }
        serde_json::from_slice(&uncompressed)
            .map_err(|e| Error::Codec(format!("json deserialize: {e}")))
    }

    /// Sequential reader over `run`, starting at its first page.
    pub fn reader(self: &Arc<Self>, run: &RunHandle) -> RunReader {
        RunReader::new(Arc::clone(self), run.clone())
    }

    /// Remove the run's storage object. Idempotent.
    pub fn delete_run(&self, run: &RunHandle) -> Result<()> {
        tracing::trace!(run = %run.path(), pages = run.num_pages(), "deleting run");
        self.storage.delete(run.path())
    }
}


#[cfg(test)]
mod tests {
    use super::test_storage::VecStorage;
    use super::*;
    use qexec_core::tuple::Tuple;
    use qexec_core::types::Scalar;

    fn page(values: &[i32]) -> Batch {
        Batch::from_tuples(
            4,
            values
                .iter()
                .map(|&v| Tuple::new(vec![Scalar::Int(v), Scalar::Str(format!("v{v}"))]))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn pages_come_back_in_order() {
        let storage = Arc::new(VecStorage::default());
        let spill = SpillManager::new(storage, Codec::None, "/spill");
        let mut run = spill.create_run("sort").unwrap();
        spill.append_page(&mut run, &page(&[1, 2, 3])).unwrap();
        spill.append_page(&mut run, &page(&[4])).unwrap();

        assert_eq!(run.num_pages(), 2);
        assert_eq!(run.num_tuples(), 4);
        assert_eq!(spill.read_page(&run, 1).unwrap(), page(&[4]));
        assert_eq!(spill.read_page(&run, 0).unwrap(), page(&[1, 2, 3]));
        assert!(matches!(
            spill.read_page(&run, 2),
            Err(Error::PageOutOfRange { index: 2, .. })
        ));
    }

    #[test]
    fn corruption_is_detected() {
        let storage = Arc::new(VecStorage::default());
        let spill = SpillManager::new(storage.clone(), Codec::None, "/spill");
        let mut run = spill.create_run("join").unwrap();
        spill.append_page(&mut run, &page(&[7, 8])).unwrap();
        storage.corrupt(run.path(), HEADER_LEN + 3);
        assert!(matches!(
            spill.read_page(&run, 0),
            Err(Error::ChecksumMismatch(_))
        ));
    }

    #[test]
    fn runs_have_distinct_paths_and_delete_cleans_up() {
        let storage = Arc::new(VecStorage::default());
        let spill = SpillManager::new(storage.clone(), Codec::None, "/spill");
        let a = spill.create_run("sort").unwrap();
        let b = spill.create_run("sort").unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(storage.len(), 2);
        spill.delete_run(&a).unwrap();
        spill.delete_run(&a).unwrap();
        spill.delete_run(&b).unwrap();
        assert_eq!(storage.len(), 0);
    }

    #[cfg(feature = "lz4")]
    #[test]
    fn compressed_pages_round_trip() {
        let storage = Arc::new(VecStorage::default());
        let spill = SpillManager::new(storage, Codec::Lz4, "/spill");
        let mut run = spill.create_run("lz4").unwrap();
        spill.append_page(&mut run, &page(&[5, 5, 5, 5])).unwrap();
        assert_eq!(spill.read_page(&run, 0).unwrap(), page(&[5, 5, 5, 5]));
    }
}
