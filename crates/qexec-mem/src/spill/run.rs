//! Run handles and sequential run readers.

use std::sync::Arc;

use qexec_core::batch::Batch;
use qexec_core::id::SpillId;
use serde::{Deserialize, Serialize};

use super::SpillManager;
use crate::error::Result;

/// Location and checksum of one page inside a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub offset: u64,
    pub len: u64,
    pub tuples: usize,
    pub checksum: [u8; 32],
}

/// Metadata of a run: where it lives and where each of its pages starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHandle {
    id: SpillId,
    path: String,
    pages: Vec<PageMeta>,
    bytes: u64,
}

impl RunHandle {
    pub(crate) fn new(id: SpillId, path: String) -> Self {
        Self {
            id,
            path,
            pages: Vec::new(),
            bytes: 0,
        }
    }

    pub(crate) fn push_page(&mut self, meta: PageMeta) {
        self.bytes += meta.len;
        self.pages.push(meta);
    }

    pub fn id(&self) -> SpillId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn page(&self, index: usize) -> Option<&PageMeta> {
        self.pages.get(index)
    }

    pub fn pages(&self) -> &[PageMeta] {
        &self.pages
    }

    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn num_tuples(&self) -> usize {
        self.pages.iter().map(|p| p.tuples).sum()
    }

    /// Bytes written so far (the offset of the next page).
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Page cursor over a run. Supports rewinding, which the nested-loop joins
/// use to rescan their right input.
pub struct RunReader {
    spill: Arc<SpillManager>,
    run: RunHandle,
    next: usize,
}

impl RunReader {
    pub(crate) fn new(spill: Arc<SpillManager>, run: RunHandle) -> Self {
        Self { spill, run, next: 0 }
    }

    pub fn run(&self) -> &RunHandle {
        &self.run
    }

    pub fn num_pages(&self) -> usize {
        self.run.num_pages()
    }

    /// Index of the page the next call to `next_page` returns.
    pub fn position(&self) -> usize {
        self.next
    }

    pub fn next_page(&mut self) -> Result<Option<Batch>> {
        if self.next >= self.run.num_pages() {
            return Ok(None);
        }
        let page = self.spill.read_page(&self.run, self.next)?;
        self.next += 1;
        Ok(Some(page))
    }

    pub fn rewind(&mut self) {
        self.next = 0;
    }

    /// Position the cursor at `page`; past-the-end simply exhausts it.
    pub fn seek(&mut self, page: usize) {
        self.next = page.min(self.run.num_pages());
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_storage::VecStorage;
    use super::super::Codec;
    use super::*;
    use qexec_core::tuple::Tuple;
    use qexec_core::types::Scalar;

    #[test]
    fn reader_rewinds_and_seeks() {
        let spill = Arc::new(SpillManager::new(
            Arc::new(VecStorage::default()),
            Codec::None,
            "/spill",
        ));
        let mut run = spill.create_run("t").unwrap();
        for v in 0..3 {
            let page = Batch::from_tuples(1, vec![Tuple::new(vec![Scalar::Int(v)])]).unwrap();
            spill.append_page(&mut run, &page).unwrap();
        }

        let mut reader = spill.reader(&run);
        let mut seen = Vec::new();
        while let Some(page) = reader.next_page().unwrap() {
            seen.push(page.tuples()[0].clone());
        }
        assert_eq!(seen.len(), 3);
        assert!(reader.next_page().unwrap().is_none());

        reader.rewind();
        assert_eq!(reader.position(), 0);
        reader.seek(2);
        let last = reader.next_page().unwrap().unwrap();
        assert_eq!(last.tuples()[0], Tuple::new(vec![Scalar::Int(2)]));
        reader.seek(10);
        assert!(reader.next_page().unwrap().is_none());
    }
}
