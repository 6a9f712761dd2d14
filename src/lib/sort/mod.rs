//! External merge-sort engine for flow records.
//!
//! The engine sorts one or more flow streams into a single non-decreasing
//! output under a multi-field comparator, handling record volumes larger
//! than RAM and run counts larger than the open-file limit.
//!
//! # Architecture
//!
//! 1. **Read phase**: stream records, materializing derived keys into each
//!    node's key suffix
//! 2. **Accumulate phase**: buffer nodes until the memory limit is reached,
//!    growing the buffer in chunks
//! 3. **Spill phase**: write each sorted buffer to a numbered run file
//! 4. **Merge phase**: k-way merge of runs via a min-heap of slot handles,
//!    with the open-file window bounded by [`external::MAX_FAN_IN`]
//!
//! Inputs that are already sorted bypass the buffer entirely and are merged
//! directly (the `presorted` fast path).

pub mod compare;
pub mod external;
pub mod fields;
pub mod heap;
pub mod input;
pub mod layout;
pub mod spill;

pub use compare::RecordComparator;
pub use external::{ExternalSorter, SortStats, DEFAULT_SORT_BUFFER_SIZE, MAX_FAN_IN};
pub use fields::{default_fields, parse_field_list, SortField};
pub use heap::SlotHeap;
pub use input::{InputQueue, NextInput};
pub use layout::{DerivedKey, NodeLayout};
pub use spill::{RunId, SpillDir};
