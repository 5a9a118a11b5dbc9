//! Run generation and merge inputs for external sort.

use qexec_core::batch::Batch;
use qexec_core::tuple::Tuple;
use qexec_mem::{RunHandle, RunReader, SpillManager};

use super::SortKey;
use crate::stream::sort_tuples;
use crate::traits::OpError;

/// Write `tuples` as one run of full pages (the last one possibly partial).
pub fn write_run(
    spill: &SpillManager,
    prefix: &str,
    tuples: Vec<Tuple>,
    capacity: usize,
    created: &mut Vec<RunHandle>,
) -> Result<RunHandle, OpError> {
    let mut run = spill.create_run(prefix)?;
    created.push(run.clone());
    let mut page = Batch::new(capacity);
    for t in tuples {
        page.push(t)?;
        if page.is_full() {
            spill.append_page(&mut run, &page)?;
            page = Batch::new(capacity);
        }
    }
    if !page.is_empty() {
        spill.append_page(&mut run, &page)?;
    }
    Ok(run)
}

/// Cut the spool into sorted runs of at most `pages_per_run` pages each.
///
/// Always yields at least one run; an empty spool gives one empty run.
pub fn generate_runs(
    spill: &SpillManager,
    spool: &mut RunReader,
    key: &SortKey,
    pages_per_run: usize,
    capacity: usize,
    created: &mut Vec<RunHandle>,
) -> Result<Vec<RunHandle>, OpError> {
    let mut runs = Vec::new();
    loop {
        let mut tuples = Vec::new();
        let mut loaded = 0;
        while loaded < pages_per_run {
            match spool.next_page()? {
                Some(page) => {
                    tuples.extend(page.into_tuples());
                    loaded += 1;
                }
                None => break,
            }
        }
        if loaded == 0 {
            break;
        }
        sort_tuples(&mut tuples, key.columns(), |a, b| key.compare(a, b))?;
        runs.push(write_run(spill, "sort-run", tuples, capacity, created)?);
    }
    if runs.is_empty() {
        runs.push(write_run(spill, "sort-run", Vec::new(), capacity, created)?);
    }
    Ok(runs)
}

/// One input of a merge: a run reader plus its current in-memory page.
pub struct MergeInput {
    reader: RunReader,
    page: Vec<Tuple>,
    pos: usize,
}

impl MergeInput {
    pub fn open(reader: RunReader) -> Result<Self, OpError> {
        let mut input = Self {
            reader,
            page: Vec::new(),
            pos: 0,
        };
        input.refill()?;
        Ok(input)
    }

    pub fn head(&self) -> Option<&Tuple> {
        self.page.get(self.pos)
    }

    /// Take the head tuple and advance, reloading the page when exhausted.
    pub fn pop(&mut self) -> Result<Option<Tuple>, OpError> {
        let Some(slot) = self.page.get_mut(self.pos) else {
            return Ok(None);
        };
        let tuple = std::mem::replace(slot, Tuple::new(Vec::new()));
        self.pos += 1;
        if self.pos >= self.page.len() {
            self.refill()?;
        }
        Ok(Some(tuple))
    }

    fn refill(&mut self) -> Result<(), OpError> {
        self.page.clear();
        self.pos = 0;
        while let Some(page) = self.reader.next_page()? {
            if !page.is_empty() {
                self.page = page.into_tuples();
                break;
            }
        }
        Ok(())
    }
}

/// Merge sorted runs into one. The extremal head is found by a linear scan;
/// ties go to the lowest input index.
pub fn merge_runs(
    spill: &std::sync::Arc<SpillManager>,
    runs: &[RunHandle],
    key: &SortKey,
    capacity: usize,
    created: &mut Vec<RunHandle>,
) -> Result<RunHandle, OpError> {
    let mut inputs = runs
        .iter()
        .map(|r| MergeInput::open(spill.reader(r)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut out_run = spill.create_run("sort-merge")?;
    created.push(out_run.clone());
    let mut out = Batch::new(capacity);

    loop {
        let mut best: Option<usize> = None;
        for (i, input) in inputs.iter().enumerate() {
            let Some(candidate) = input.head() else {
                continue;
            };
            let better = match best.and_then(|b| inputs[b].head()) {
                None => true,
                Some(current) => key.compare(candidate, current)?.is_lt(),
            };
            if better {
                best = Some(i);
            }
        }
        let Some(winner) = best else {
            break;
        };
        if let Some(tuple) = inputs[winner].pop()? {
            out.push(tuple)?;
        }
        if out.is_full() {
            spill.append_page(&mut out_run, &out)?;
            out = Batch::new(capacity);
        }
    }
    if !out.is_empty() {
        spill.append_page(&mut out_run, &out)?;
    }
    Ok(out_run)
}
