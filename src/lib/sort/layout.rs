//! Node layout: one record plus its materialized key suffix.
//!
//! A *node* is the unit the sort engine moves around: the raw record bytes
//! followed by a key-suffix region holding binary keys that are expensive to
//! derive from the record at comparison time. Derived keys are filled in once
//! on ingest and compared through the [`DerivedKey`] callbacks.

use crate::errors::Result;
use crate::flow::record::{FlowView, RECORD_SIZE};
use std::cmp::Ordering;
use std::sync::Arc;

/// A caller-supplied key that lives in the node's key-suffix region.
///
/// Implementations materialize `width()` bytes from a record on ingest and
/// compare two previously-materialized byte runs. Both operations may fail;
/// a failure aborts the whole sort.
pub trait DerivedKey: Send + Sync {
    /// Name used in error messages.
    fn name(&self) -> &str;

    /// Number of suffix bytes this key occupies.
    fn width(&self) -> usize;

    /// Fills `out` (exactly `width()` bytes) from `record`.
    fn materialize(&self, record: FlowView<'_>, out: &mut [u8]) -> Result<()>;

    /// Orders two materialized key values.
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering>;
}

/// Placement of one derived key within the node.
#[derive(Debug, Clone, Copy)]
pub struct SuffixField {
    /// Absolute byte offset within the node.
    pub offset: usize,
    /// Width in bytes.
    pub width: usize,
}

/// Describes the byte layout shared by every node of a sort invocation.
#[derive(Clone)]
pub struct NodeLayout {
    node_size: usize,
    derived: Vec<(SuffixField, Arc<dyn DerivedKey>)>,
}

impl Default for NodeLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeLayout {
    /// A layout with no derived keys: the node is exactly the record.
    #[must_use]
    pub fn new() -> Self {
        Self { node_size: RECORD_SIZE, derived: Vec::new() }
    }

    /// Appends a derived key to the suffix, returning its index.
    pub fn push_derived(&mut self, key: Arc<dyn DerivedKey>) -> usize {
        let field = SuffixField { offset: self.node_size, width: key.width() };
        self.node_size += field.width;
        self.derived.push((field, key));
        self.derived.len() - 1
    }

    /// Size of the record prefix.
    #[must_use]
    pub fn record_size(&self) -> usize {
        RECORD_SIZE
    }

    /// Total node size: record plus key suffix.
    #[must_use]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// The derived keys and their placements, in field order.
    #[must_use]
    pub fn derived(&self) -> &[(SuffixField, Arc<dyn DerivedKey>)] {
        &self.derived
    }

    /// Materializes every derived key of `node` from its record prefix.
    ///
    /// `node` must be exactly `node_size()` bytes with the record already in
    /// place.
    pub fn materialize_suffix(&self, node: &mut [u8]) -> Result<()> {
        debug_assert_eq!(node.len(), self.node_size);
        if self.derived.is_empty() {
            return Ok(());
        }
        let (record, suffix) = node.split_at_mut(RECORD_SIZE);
        let view = FlowView::new(record);
        for (field, key) in &self.derived {
            let start = field.offset - RECORD_SIZE;
            key.materialize(view, &mut suffix[start..start + field.width])?;
        }
        Ok(())
    }
}
