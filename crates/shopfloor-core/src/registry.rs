//! Immutable registry of the stage sequence and product types.
//!
//! Frozen at engine construction. Stage order *is* the pipeline: items enter
//! at stage 0 and advance one stage per carry until the sequence runs out.
//! No runtime string lookups happen in the sim loop; names resolve to ids
//! here, once.

use crate::fixed::Fixed64;
use crate::id::{ProductTypeId, StageId};
use std::collections::HashMap;

/// A pipeline stage definition.
#[derive(Debug, Clone)]
pub struct StageDef {
    pub name: String,
    pub display_name: String,
    /// Sim-seconds one PROCESS task takes at this stage.
    pub work_duration: Fixed64,
}

impl StageDef {
    pub fn new(name: &str, display_name: &str, work_duration: Fixed64) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            work_duration,
        }
    }
}

/// A product type definition.
#[derive(Debug, Clone)]
pub struct ProductDef {
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("a registry needs at least one stage")]
    NoStages,
    #[error("duplicate stage name '{0}'")]
    DuplicateStage(String),
    #[error("duplicate product name '{0}'")]
    DuplicateProduct(String),
}

/// The frozen stage sequence and product table.
#[derive(Debug, Clone)]
pub struct StageRegistry {
    stages: Vec<StageDef>,
    products: Vec<ProductDef>,
    stage_name_to_id: HashMap<String, StageId>,
    product_name_to_id: HashMap<String, ProductTypeId>,
}

impl StageRegistry {
    /// Build a registry from ordered stage definitions and product names.
    /// Validates that the sequence is non-empty and names are unique.
    pub fn new(stages: Vec<StageDef>, products: Vec<ProductDef>) -> Result<Self, RegistryError> {
        if stages.is_empty() {
            return Err(RegistryError::NoStages);
        }

        let mut stage_name_to_id = HashMap::new();
        for (i, def) in stages.iter().enumerate() {
            if stage_name_to_id
                .insert(def.name.clone(), StageId(i as u32))
                .is_some()
            {
                return Err(RegistryError::DuplicateStage(def.name.clone()));
            }
        }

        let mut product_name_to_id = HashMap::new();
        for (i, def) in products.iter().enumerate() {
            if product_name_to_id
                .insert(def.name.clone(), ProductTypeId(i as u32))
                .is_some()
            {
                return Err(RegistryError::DuplicateProduct(def.name.clone()));
            }
        }

        Ok(Self {
            stages,
            products,
            stage_name_to_id,
            product_name_to_id,
        })
    }

    pub fn stage(&self, id: StageId) -> Option<&StageDef> {
        self.stages.get(id.0 as usize)
    }

    pub fn stage_id(&self, name: &str) -> Option<StageId> {
        self.stage_name_to_id.get(name).copied()
    }

    /// Where new items enter the pipeline.
    pub fn first_stage(&self) -> StageId {
        StageId(0)
    }

    /// The stage after `id`, or `None` when `id` is the final stage (the
    /// item is delivered next).
    pub fn next_stage(&self, id: StageId) -> Option<StageId> {
        let next = id.0 as usize + 1;
        if next < self.stages.len() {
            Some(StageId(next as u32))
        } else {
            None
        }
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// All stage ids in pipeline order.
    pub fn stage_ids(&self) -> impl Iterator<Item = StageId> + '_ {
        (0..self.stages.len()).map(|i| StageId(i as u32))
    }

    pub fn product(&self, id: ProductTypeId) -> Option<&ProductDef> {
        self.products.get(id.0 as usize)
    }

    pub fn product_id(&self, name: &str) -> Option<ProductTypeId> {
        self.product_name_to_id.get(name).copied()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}
