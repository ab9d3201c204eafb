use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a worker agent owned by the crew.
    pub struct WorkerId;

    /// Identifies a pipeline item moving through the departments.
    pub struct ItemId;

    /// Identifies a schedulable unit of work in the task table.
    pub struct TaskId;

    /// Identifies an accepted order.
    pub struct OrderId;
}

/// Identifies a pipeline stage. Index into the frozen stage sequence
/// held by the [`crate::registry::StageRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StageId(pub u32);

/// Identifies a product type in the registry. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductTypeId(pub u32);
