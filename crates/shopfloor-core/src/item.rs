//! Pipeline items: the physical units moving through the departments.

use crate::grid::WorldPos;
use crate::id::{OrderId, ProductTypeId, StageId, WorkerId};
use serde::{Deserialize, Serialize};

/// Where an item currently is in the pipeline. Stages only ever advance
/// forward until the terminal `Delivered` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStage {
    /// Resident in the department for this stage.
    At(StageId),
    /// Carried out of the final stage; ownership has passed to the order
    /// collaborator.
    Delivered,
}

impl ItemStage {
    pub fn stage_id(&self) -> Option<StageId> {
        match self {
            ItemStage::At(stage) => Some(*stage),
            ItemStage::Delivered => None,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, ItemStage::Delivered)
    }
}

/// One physical unit of a single order line.
///
/// Mutated exclusively through scheduler transitions. An item is in exactly
/// one of four conditions: idle in a buffer, being worked (`being_processed`),
/// awaiting pickup (`ready_to_carry`, no carrier), or in transit (carrier
/// set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub product: ProductTypeId,
    pub order: OrderId,
    pub stage: ItemStage,
    /// Worker currently carrying this item, if any.
    pub carrier: Option<WorkerId>,
    /// A PROCESS task exists (or runs) for this item at the current stage.
    pub being_processed: bool,
    /// Processing at the current stage is done.
    pub processed: bool,
    /// Needs a carrier to the next stage.
    pub ready_to_carry: bool,
    /// World position, updated at drop-point handoffs.
    pub pos: WorldPos,
}

impl Item {
    pub fn new(product: ProductTypeId, order: OrderId, stage: StageId, pos: WorldPos) -> Self {
        Self {
            product,
            order,
            stage: ItemStage::At(stage),
            carrier: None,
            being_processed: false,
            processed: false,
            ready_to_carry: false,
            pos,
        }
    }

    /// Move to the next stage (or `Delivered` when there is none), clearing
    /// all in-flight state for the stage being left.
    pub fn advance(&mut self, next: Option<StageId>) {
        self.stage = match next {
            Some(stage) => ItemStage::At(stage),
            None => ItemStage::Delivered,
        };
        self.being_processed = false;
        self.processed = false;
        self.ready_to_carry = false;
        self.carrier = None;
    }

    /// Waiting in buffer with no processing started yet.
    pub fn is_pending(&self) -> bool {
        !self.being_processed && !self.processed
    }

    /// Processed and waiting for a carrier to claim it.
    pub fn awaiting_carrier(&self) -> bool {
        self.ready_to_carry && self.carrier.is_none()
    }
}
