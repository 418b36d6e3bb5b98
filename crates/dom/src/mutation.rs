//! Mutation records and the batched observer interface.

use indextree::NodeId;

/// One observed change to the tree.
///
/// Records are transient: they are queued by the document as mutations
/// happen and handed to observers in batches. Observers must not assume the
/// described state still holds by the time a batch is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// A node was inserted into or removed from `target`'s child list.
    ChildList {
        /// Parent whose child list changed.
        target: NodeId,
    },
    /// An attribute on `target` changed value.
    Attribute {
        /// Node whose attribute changed.
        target: NodeId,
        /// Lowercased attribute name.
        name: String,
        /// Value before the change, if the attribute existed.
        old_value: Option<String>,
        /// Value after the change, `None` when the attribute was removed.
        new_value: Option<String>,
    },
}

/// Receiver for batched mutation notifications.
///
/// Batches are delivered synchronously from [`crate::Document::deliver_pending`],
/// one callback per pending queue drain. Implementations that have been torn
/// down are expected to no-op.
pub trait MutationObserver: Send + Sync {
    /// Process one batch of mutation records.
    fn on_mutations(&self, batch: &[MutationRecord]);
}
