//! External merge-sort engine for flow records.
//!
//! Implements sorting for record volumes larger than available RAM by
//! spilling sorted runs to temporary files and merging them under a bounded
//! file-descriptor budget.
//!
//! # Algorithm
//!
//! 1. **Accumulate phase**: read records into a single buffer that grows in
//!    chunks toward the configured limit
//! 2. **Sort phase**: order the buffered nodes with the configured comparator
//! 3. **Spill phase**: write the sorted buffer to a numbered run file when it
//!    fills before the input ends
//! 4. **Merge phase**: k-way merge of runs using a min-heap of slot handles,
//!    at most [`MAX_FAN_IN`] runs open at a time; when more runs are pending
//!    than the window admits, a pass writes an intermediate run that rejoins
//!    the pending set
//!
//! Inputs that are already sorted skip the buffer entirely: the streams
//! occupy merge slots directly (`presorted`), cascading through intermediate
//! runs only when the stream count exceeds the window or descriptors run
//! out.
//!
//! # Robustness
//!
//! - The buffer is grown incrementally and a failed grow freezes it at its
//!   current size, converting latent over-commit kills into spilling.
//! - `EMFILE`/`ENFILE`/`ENOMEM` while opening a run with at least one source
//!   already open narrows the merge window instead of failing.
//! - All spill files live in an invocation-private directory that is removed
//!   on every exit path.

use crate::errors::{FlowkitError, Result};
use crate::flow::stream::{FlowReader, FlowWriter};
use crate::progress::ProgressTracker;
use crate::sort::compare::RecordComparator;
use crate::sort::fields::SortField;
use crate::sort::heap::{Slot, SlotHeap};
use crate::sort::input::{fill_node, InputQueue, NextInput};
use crate::sort::layout::{DerivedKey, NodeLayout};
use crate::sort::spill::{OpenRunError, RunId, RunReader, RunWriter, SpillDir};
use log::{debug, info, trace};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maximum number of sources open simultaneously during one merge pass.
///
/// Chosen below the customary per-process descriptor soft limit; the merge
/// protocol holds at most this many run readers plus one intermediate-run
/// writer and the final output.
pub const MAX_FAN_IN: usize = 512;

/// Default upper bound on in-core buffer bytes (256 MB).
pub const DEFAULT_SORT_BUFFER_SIZE: u64 = 256 * 1024 * 1024;

/// Number of chunks the buffer initially grows by; raised when even the
/// first chunk cannot be allocated.
const SORT_NUM_CHUNKS: usize = 6;

/// Floor on the in-core record count. Failing to allocate even this many
/// records is fatal.
pub const MIN_IN_CORE_RECORDS: usize = 1024;

/// Statistics from a sort invocation.
#[derive(Default, Debug)]
pub struct SortStats {
    /// Records read from the inputs.
    pub total_records: u64,
    /// Records written to the final output.
    pub output_records: u64,
    /// Sorted runs written to disk (spills plus cascaded intermediates).
    pub runs_written: u32,
    /// Bounded fan-in merge passes executed.
    pub merge_passes: u32,
}

/// External sorter for flow files.
///
/// Configure with the builder methods, then call [`sort`](Self::sort).
pub struct ExternalSorter {
    fields: Vec<SortField>,
    derived: Vec<Arc<dyn DerivedKey>>,
    reverse: bool,
    presorted: bool,
    sort_buffer_size: u64,
    temp_dir: Option<PathBuf>,
    max_fan_in: usize,
}

impl ExternalSorter {
    /// Creates a sorter ordering records by `fields`.
    #[must_use]
    pub fn new(fields: Vec<SortField>) -> Self {
        Self {
            fields,
            derived: Vec::new(),
            reverse: false,
            presorted: false,
            sort_buffer_size: DEFAULT_SORT_BUFFER_SIZE,
            temp_dir: None,
            max_fan_in: MAX_FAN_IN,
        }
    }

    /// Appends a derived key; it orders after the builtin fields, in the
    /// order added.
    #[must_use]
    pub fn derived_key(mut self, key: Arc<dyn DerivedKey>) -> Self {
        self.derived.push(key);
        self
    }

    /// Negates the comparator's orientation.
    #[must_use]
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Asserts that every input is already sorted under the same fields and
    /// orientation, enabling the direct-merge fast path.
    #[must_use]
    pub fn presorted(mut self, presorted: bool) -> Self {
        self.presorted = presorted;
        self
    }

    /// Sets the upper bound on in-core buffer bytes.
    #[must_use]
    pub fn sort_buffer_size(mut self, bytes: u64) -> Self {
        self.sort_buffer_size = bytes;
        self
    }

    /// Sets the working directory for spill files.
    #[must_use]
    pub fn temp_dir(mut self, path: PathBuf) -> Self {
        self.temp_dir = Some(path);
        self
    }

    /// Overrides the merge window size (default [`MAX_FAN_IN`]).
    #[must_use]
    pub fn max_fan_in(mut self, fan_in: usize) -> Self {
        self.max_fan_in = fan_in;
        self
    }

    /// Sorts `inputs` into `output`.
    pub fn sort(&self, inputs: &[PathBuf], output: &Path) -> Result<SortStats> {
        let mut layout = NodeLayout::new();
        for key in &self.derived {
            layout.push_derived(Arc::clone(key));
        }
        let node_size = layout.node_size();
        self.validate(node_size)?;
        let comparator =
            RecordComparator::new(self.fields.clone(), layout.clone(), self.reverse);

        info!(
            "Sorting {} input(s) ({} path, buffer {} MB, fan-in {})",
            inputs.len(),
            if self.presorted { "presorted" } else { "random" },
            self.sort_buffer_size / (1024 * 1024),
            self.max_fan_in,
        );

        let mut spill = SpillDir::new(self.temp_dir.as_deref(), node_size)?;
        let mut writer = FlowWriter::create(output)?;
        let mut queue = InputQueue::new(inputs.to_vec());
        let mut stats = SortStats::default();

        let highest = if self.presorted {
            self.merge_presorted(&mut queue, &layout, &comparator, &mut spill, &mut writer, &mut stats)?
        } else {
            self.sort_random(&mut queue, &layout, &comparator, &mut spill, &mut writer, &mut stats)?
        };

        if let Some(highest) = highest {
            self.merge_runs(highest, &layout, &comparator, &mut spill, &mut writer, &mut stats)?;
        }

        stats.output_records = writer.records_written();
        writer.finish()?;

        debug!(
            "sort finished: {} read, {} written, {} runs, {} merge passes",
            stats.total_records, stats.output_records, stats.runs_written, stats.merge_passes
        );
        Ok(stats)
    }

    fn validate(&self, node_size: usize) -> Result<()> {
        if self.fields.is_empty() && self.derived.is_empty() {
            return Err(FlowkitError::InvalidParameter {
                parameter: "fields".to_string(),
                reason: "at least one sort field is required".to_string(),
            });
        }
        if self.sort_buffer_size < node_size as u64 {
            return Err(FlowkitError::InvalidParameter {
                parameter: "sort-buffer-size".to_string(),
                reason: format!("must hold at least one {node_size}-byte node"),
            });
        }
        if self.max_fan_in < 2 || self.max_fan_in > MAX_FAN_IN {
            return Err(FlowkitError::InvalidParameter {
                parameter: "max-fan-in".to_string(),
                reason: format!("must be between 2 and {MAX_FAN_IN}"),
            });
        }
        Ok(())
    }

    /// Random path: buffer, sort in core, spill when full. Returns the
    /// highest run id written, or `None` when the output is already
    /// complete.
    fn sort_random(
        &self,
        queue: &mut InputQueue,
        layout: &NodeLayout,
        comparator: &RecordComparator,
        spill: &mut SpillDir,
        writer: &mut FlowWriter,
        stats: &mut SortStats,
    ) -> Result<Option<RunId>> {
        let node_size = layout.node_size();
        let max_records = (self.sort_buffer_size / node_size as u64) as usize;
        let mut buffer = SortBuffer::allocate(node_size, max_records)?;
        let mut highest: Option<RunId> = None;
        let progress = ProgressTracker::new("Read records");

        let mut current = match queue.next_input()? {
            NextInput::Stream(reader) => Some(reader),
            NextInput::Done => None,
            NextInput::Exhausted { path, source } => {
                return Err(FlowkitError::Input { path, source });
            }
        };

        while let Some(reader) = current.as_mut() {
            let filled = {
                let node = buffer.push_slot();
                fill_node(reader, layout, node)?
            };
            if !filled {
                buffer.pop_slot();
                // Inputs are processed one at a time on this path, so an
                // exhausted open here cannot be recovered by closing peers.
                current = match queue.next_input()? {
                    NextInput::Stream(reader) => Some(reader),
                    NextInput::Done => None,
                    NextInput::Exhausted { path, source } => {
                        return Err(FlowkitError::Input { path, source });
                    }
                };
                continue;
            }

            stats.total_records += 1;
            progress.log_if_needed(1);

            if buffer.is_full() {
                if !buffer.at_max() {
                    buffer.grow_or_freeze();
                }
                if buffer.is_full() && buffer.at_max() {
                    highest = Some(spill_sorted(&buffer, comparator, spill, stats)?);
                    buffer.clear();
                }
            }
        }
        progress.log_final();

        if buffer.count() > 0 {
            if highest.is_some() {
                highest = Some(spill_sorted(&buffer, comparator, spill, stats)?);
            } else {
                // Everything fit in memory: sort once and emit directly.
                debug!("all {} records fit in memory", buffer.count());
                let mut nodes: Vec<&[u8]> = buffer.nodes().collect();
                comparator.sort_nodes(&mut nodes)?;
                for node in &nodes {
                    writer.write_record(&node[..layout.record_size()])?;
                }
            }
        }

        Ok(highest)
    }

    /// Pre-sorted path: feed input streams directly into merge slots,
    /// cascading to intermediate runs when the window or the descriptors run
    /// out. Returns the highest run id written, or `None` when the output is
    /// already complete.
    fn merge_presorted(
        &self,
        queue: &mut InputQueue,
        layout: &NodeLayout,
        comparator: &RecordComparator,
        spill: &mut SpillDir,
        writer: &mut FlowWriter,
        stats: &mut SortStats,
    ) -> Result<Option<RunId>> {
        let node_size = layout.node_size();
        let mut highest: Option<RunId> = None;
        let mut first_pass = true;

        loop {
            // Created up front so the pass can fall back to it; discarded
            // unopened when the pass writes the final output.
            let (inter_id, inter_writer) = spill.create()?;

            let mut slots: Vec<MergeSlot<StreamSource<'_>>> = Vec::new();
            let mut all_inputs_open = false;
            while slots.len() < self.max_fan_in {
                match queue.next_input()? {
                    NextInput::Stream(reader) => slots.push(MergeSlot {
                        source: StreamSource { reader, layout },
                        node: vec![0u8; node_size],
                    }),
                    NextInput::Done => {
                        all_inputs_open = true;
                        break;
                    }
                    NextInput::Exhausted { path, source } => {
                        if slots.is_empty() {
                            return Err(FlowkitError::Input { path, source });
                        }
                        trace!(
                            "cannot open all inputs (out of file handles); \
                             cascading {} streams",
                            slots.len()
                        );
                        break;
                    }
                }
            }

            stats.merge_passes += 1;
            let written = if all_inputs_open && first_pass {
                drop(inter_writer);
                spill.remove(inter_id);
                trace!("merging {} presorted inputs into output", slots.len());
                let mut sink = MergeSink::Output(writer);
                merge_window(&mut slots, comparator, &mut sink, layout.record_size())?
            } else {
                trace!("merging {} presorted inputs into run #{inter_id}", slots.len());
                let mut sink = MergeSink::Run(inter_writer);
                let written = merge_window(&mut slots, comparator, &mut sink, layout.record_size())?;
                sink.finish()?;
                stats.runs_written += 1;
                highest = Some(inter_id);
                written
            };
            stats.total_records += written;
            drop(slots);

            if all_inputs_open {
                return Ok(highest);
            }
            first_pass = false;
        }
    }

    /// Merges runs `0..=highest` into the output under the fan-in bound,
    /// producing cascading intermediate runs as needed.
    fn merge_runs(
        &self,
        mut highest: RunId,
        layout: &NodeLayout,
        comparator: &RecordComparator,
        spill: &mut SpillDir,
        writer: &mut FlowWriter,
        stats: &mut SortStats,
    ) -> Result<()> {
        let node_size = layout.node_size();
        let span = self.max_fan_in as RunId;
        let mut lo: RunId = 0;

        loop {
            let mut hi = if highest - lo < span { highest } else { lo + span - 1 };

            // Created before the window opens; this is the pass output
            // unless every pending run fits in the window.
            let (inter_id, inter_writer) = spill.create()?;

            let mut slots: Vec<MergeSlot<RunSource>> = Vec::new();
            let mut id = lo;
            while id <= hi {
                match spill.open(id) {
                    Ok(reader) => {
                        slots.push(MergeSlot {
                            source: RunSource { reader },
                            node: vec![0u8; node_size],
                        });
                        id += 1;
                    }
                    Err(OpenRunError::Exhausted(_)) if !slots.is_empty() => {
                        // Catch the failed id on the next pass.
                        hi = id - 1;
                        trace!(
                            "file handle limit hit; merging #{lo}..#{hi} into #{inter_id}"
                        );
                        break;
                    }
                    Err(e) => return Err(FlowkitError::TempFile { source: e.into_io() }),
                }
            }

            let final_pass = hi == highest;
            stats.merge_passes += 1;
            if final_pass {
                drop(inter_writer);
                spill.remove(inter_id);
                trace!("merging runs #{lo}..#{hi} into output");
                let mut sink = MergeSink::Output(writer);
                merge_window(&mut slots, comparator, &mut sink, layout.record_size())?;
            } else {
                trace!("merging runs #{lo}..#{hi} into run #{inter_id}");
                let mut sink = MergeSink::Run(inter_writer);
                merge_window(&mut slots, comparator, &mut sink, layout.record_size())?;
                sink.finish()?;
                stats.runs_written += 1;
            }

            // Close every source in the window, then unlink them.
            drop(slots);
            for id in lo..=hi {
                spill.remove(id);
            }

            if final_pass {
                return Ok(());
            }
            highest = inter_id;
            lo = hi + 1;
        }
    }
}

/// Writes the sorted contents of `buffer` as a new run.
fn spill_sorted(
    buffer: &SortBuffer,
    comparator: &RecordComparator,
    spill: &mut SpillDir,
    stats: &mut SortStats,
) -> Result<RunId> {
    let mut nodes: Vec<&[u8]> = buffer.nodes().collect();
    comparator.sort_nodes(&mut nodes)?;
    let id = spill.write_sorted_run(&nodes)?;
    stats.runs_written += 1;
    debug!("wrote sorted run #{id} ({} records)", nodes.len());
    Ok(id)
}

/// The in-core sort buffer: one contiguous allocation of whole nodes.
///
/// The buffer starts at `max_records / SORT_NUM_CHUNKS` records and grows a
/// chunk at a time. The kernel may grant a large allocation optimistically
/// and only fault when it is touched; growing incrementally converts that
/// latent failure into a recoverable grow failure, which freezes the buffer
/// at its current size for the rest of the invocation.
struct SortBuffer {
    data: Vec<u8>,
    node_size: usize,
    capacity_records: usize,
    max_records: usize,
    chunk_records: usize,
}

impl SortBuffer {
    fn allocate(node_size: usize, max_records: usize) -> Result<Self> {
        let mut num_chunks = SORT_NUM_CHUNKS;
        loop {
            let chunk_records = (max_records / num_chunks).clamp(1, max_records);
            let mut data = Vec::new();
            match data.try_reserve_exact(chunk_records * node_size) {
                Ok(()) => {
                    trace!(
                        "sort buffer: {chunk_records} of {max_records} records \
                         ({num_chunks} chunks)"
                    );
                    return Ok(Self {
                        data,
                        node_size,
                        capacity_records: chunk_records,
                        max_records,
                        chunk_records,
                    });
                }
                Err(_) if chunk_records < MIN_IN_CORE_RECORDS => {
                    return Err(FlowkitError::Allocation { records: chunk_records });
                }
                Err(_) => {
                    trace!("initial allocation of {chunk_records} records failed");
                    num_chunks += 1;
                }
            }
        }
    }

    fn count(&self) -> usize {
        self.data.len() / self.node_size
    }

    /// Extends the buffer by one node slot and returns it. Only valid while
    /// the buffer is not full; the slot lies within reserved capacity, so no
    /// allocation happens here.
    fn push_slot(&mut self) -> &mut [u8] {
        debug_assert!(self.count() < self.capacity_records);
        let start = self.data.len();
        self.data.resize(start + self.node_size, 0);
        &mut self.data[start..]
    }

    /// Gives back the most recently pushed slot (EOF hit instead of a record).
    fn pop_slot(&mut self) {
        let len = self.data.len() - self.node_size;
        self.data.truncate(len);
    }

    fn is_full(&self) -> bool {
        self.count() == self.capacity_records
    }

    fn at_max(&self) -> bool {
        self.capacity_records >= self.max_records
    }

    /// Grows capacity by one chunk, capped at the maximum. On allocation
    /// failure the buffer freezes: the maximum is lowered to the current
    /// capacity and no further grow is attempted this invocation.
    fn grow_or_freeze(&mut self) {
        debug_assert!(self.is_full() && !self.at_max());
        let target = (self.capacity_records + self.chunk_records).min(self.max_records);
        let additional = (target - self.count()) * self.node_size;
        match self.data.try_reserve_exact(additional) {
            Ok(()) => {
                trace!("grew sort buffer to {target} records");
                self.capacity_records = target;
            }
            Err(_) => {
                trace!(
                    "grow to {target} records failed; freezing at {}",
                    self.capacity_records
                );
                self.max_records = self.capacity_records;
            }
        }
    }

    fn nodes(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.node_size)
    }

    fn clear(&mut self) {
        self.data.clear();
    }
}

/// One source of nodes for a merge pass.
trait NodeSource {
    /// Reads the next node. `Ok(false)` on clean end of source.
    fn next_node(&mut self, node: &mut [u8]) -> Result<bool>;
}

/// A spilled run being merged.
struct RunSource {
    reader: RunReader,
}

impl NodeSource for RunSource {
    fn next_node(&mut self, node: &mut [u8]) -> Result<bool> {
        self.reader.read_node(node)
    }
}

/// A presorted input stream occupying a merge slot.
struct StreamSource<'a> {
    reader: FlowReader,
    layout: &'a NodeLayout,
}

impl NodeSource for StreamSource<'_> {
    fn next_node(&mut self, node: &mut [u8]) -> Result<bool> {
        fill_node(&mut self.reader, self.layout, node)
    }
}

/// A merge slot: an open source plus its one-node read buffer.
struct MergeSlot<S> {
    source: S,
    node: Vec<u8>,
}

/// Where a merge pass writes: an intermediate run (whole nodes) or the final
/// output (record prefix only).
enum MergeSink<'a> {
    Run(RunWriter),
    Output(&'a mut FlowWriter),
}

impl MergeSink<'_> {
    fn write_node(&mut self, node: &[u8], record_size: usize) -> Result<()> {
        match self {
            MergeSink::Run(writer) => writer.write_node(node),
            MergeSink::Output(writer) => writer.write_record(&node[..record_size]),
        }
    }

    fn finish(self) -> Result<()> {
        match self {
            MergeSink::Run(writer) => writer.finish(),
            MergeSink::Output(_) => Ok(()),
        }
    }
}

/// Heap-merges the slots into the sink. Returns the number of nodes written.
///
/// Empty sources are skipped. Once a single source remains it is drained
/// straight through without further heap operations.
fn merge_window<S: NodeSource>(
    slots: &mut [MergeSlot<S>],
    comparator: &RecordComparator,
    sink: &mut MergeSink<'_>,
    record_size: usize,
) -> Result<u64> {
    let mut heap = SlotHeap::with_capacity(slots.len());

    for i in 0..slots.len() {
        let filled = {
            let slot = &mut slots[i];
            slot.source.next_node(&mut slot.node)?
        };
        if filled {
            heap.insert(i as Slot, &mut |a, b| {
                comparator.compare(&slots[a as usize].node, &slots[b as usize].node)
            })?;
        } else {
            trace!("skipping empty merge source in slot {i}");
        }
    }

    let mut written = 0u64;
    while heap.len() > 1 {
        let Some(top) = heap.peek() else { break };
        sink.write_node(&slots[top as usize].node, record_size)?;
        written += 1;

        let refilled = {
            let slot = &mut slots[top as usize];
            slot.source.next_node(&mut slot.node)?
        };
        if refilled {
            heap.replace_top(top, &mut |a, b| {
                comparator.compare(&slots[a as usize].node, &slots[b as usize].node)
            })?;
        } else {
            heap.extract_top(&mut |a, b| {
                comparator.compare(&slots[a as usize].node, &slots[b as usize].node)
            })?;
        }
    }

    let last = heap.extract_top(&mut |a, b| {
        comparator.compare(&slots[a as usize].node, &slots[b as usize].node)
    })?;
    if let Some(last) = last {
        loop {
            sink.write_node(&slots[last as usize].node, record_size)?;
            written += 1;
            let refilled = {
                let slot = &mut slots[last as usize];
                slot.source.next_node(&mut slot.node)?
            };
            if !refilled {
                break;
            }
        }
    }

    Ok(written)
}
