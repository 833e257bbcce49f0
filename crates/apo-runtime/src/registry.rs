// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed registry of stage implementations, built by the [`StageFactory`]
//! contract (§4.3).

use apo_core::{Stage, StageId};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while assembling a [`StageRegistry`].
#[derive(Debug, Error)]
pub enum StageRegistryError {
    /// A stage id from the canonical pipeline was not supplied.
    #[error("missing stage: {0:?}")]
    MissingStage(StageId),
    /// A critical stage id from the canonical pipeline was not supplied.
    #[error("missing critical stage: {0:?}")]
    MissingCriticalStage(StageId),
    /// The same stage id was registered more than once.
    #[error("duplicate stage id: {0:?}")]
    DuplicateStage(StageId),
}

/// A typed registry mapping [`StageId`] to its [`Stage`] implementation.
///
/// [`StageRegistryBuilder::build`] enforces the [`StageFactory`] contract:
/// every id in the canonical pipeline must be present exactly once, every
/// critical id must be present, and no unknown id may sneak in (unknown ids
/// are structurally impossible here since [`StageId`] is a closed enum).
pub struct StageRegistry {
    stages: BTreeMap<StageId, Arc<dyn Stage>>,
}

impl std::fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRegistry")
            .field("stages", &self.stages.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StageRegistry {
    /// Look up a stage implementation by id.
    #[must_use]
    pub fn get(&self, id: StageId) -> Option<Arc<dyn Stage>> {
        self.stages.get(&id).cloned()
    }

    /// Number of registered stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// `true` if no stages are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Builder for [`StageRegistry`] (the `StageFactory` of §4.3).
#[derive(Default)]
pub struct StageRegistryBuilder {
    stages: BTreeMap<StageId, Arc<dyn Stage>>,
}

impl std::fmt::Debug for StageRegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRegistryBuilder")
            .field("stages", &self.stages.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StageRegistryBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stage implementation under its own [`Stage::id`].
    pub fn register(
        mut self,
        stage: impl Stage + 'static,
    ) -> Result<Self, StageRegistryError> {
        let id = stage.id();
        if self.stages.insert(id, Arc::new(stage)).is_some() {
            return Err(StageRegistryError::DuplicateStage(id));
        }
        Ok(self)
    }

    /// Validate completeness and produce the finished [`StageRegistry`].
    pub fn build(self) -> Result<StageRegistry, StageRegistryError> {
        for id in StageId::ALL {
            if !self.stages.contains_key(&id) {
                if id.is_critical() {
                    return Err(StageRegistryError::MissingCriticalStage(id));
                }
                return Err(StageRegistryError::MissingStage(id));
            }
        }
        Ok(StageRegistry {
            stages: self.stages,
        })
    }
}
