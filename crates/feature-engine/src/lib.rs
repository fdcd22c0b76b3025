pub mod rebuild;
pub mod resolve;
pub mod tree;
pub mod types;
pub mod undo;

use std::collections::HashMap;
use uuid::Uuid;

use solidtype_modeling_ops::{KernelBundle, OpResult};

use crate::types::{EngineError, FeatureTree, Operation};
use crate::undo::{Command, UndoStack};

/// The parametric modeling engine.
///
/// Manages the feature tree, holds the kernel instance, and coordinates
/// rebuilds with GeomRef resolution.
pub struct Engine {
    /// The feature tree.
    pub tree: FeatureTree,
    /// Cached results from the last rebuild.
    pub feature_results: HashMap<Uuid, OpResult>,
    /// Warnings from the last rebuild.
    pub warnings: Vec<String>,
    /// Errors from the last rebuild.
    pub errors: Vec<(Uuid, String)>,
    /// Reversible command history (§5 ordering guarantees apply to the
    /// replayed feature list, not to undo/redo bookkeeping itself).
    undo_stack: UndoStack,
}

impl Engine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self {
            tree: FeatureTree::new(),
            feature_results: HashMap::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            undo_stack: UndoStack::new(),
        }
    }

    /// Add a feature and rebuild.
    pub fn add_feature(
        &mut self,
        name: String,
        operation: Operation,
        kb: &mut dyn KernelBundle,
    ) -> Result<Uuid, EngineError> {
        let id = self.tree.add_feature(name, operation);
        let pos = self.tree.feature_index(id).unwrap_or(0);
        let feature = self.tree.find_feature(id).cloned().expect("just inserted");
        self.undo_stack.push(Command::AddFeature {
            feature: Box::new(feature),
            position: pos,
        });
        self.rebuild(kb, pos);
        Ok(id)
    }

    /// Remove a feature and rebuild.
    pub fn remove_feature(
        &mut self,
        id: Uuid,
        kb: &mut dyn KernelBundle,
    ) -> Result<(), EngineError> {
        let pos = self
            .tree
            .feature_index(id)
            .ok_or(EngineError::FeatureNotFound { id })?;
        let removed = self.tree.remove_feature(id)?;
        self.feature_results.remove(&id);
        self.undo_stack.push(Command::RemoveFeature {
            feature: Box::new(removed),
            position: pos,
        });
        self.rebuild(kb, pos.min(self.tree.features.len().saturating_sub(1)));
        Ok(())
    }

    /// Edit a feature's operation and rebuild from that point.
    pub fn edit_feature(
        &mut self,
        id: Uuid,
        operation: Operation,
        kb: &mut dyn KernelBundle,
    ) -> Result<(), EngineError> {
        let pos = self
            .tree
            .feature_index(id)
            .ok_or(EngineError::FeatureNotFound { id })?;

        let feature = self
            .tree
            .find_feature_mut(id)
            .ok_or(EngineError::FeatureNotFound { id })?;
        let old_operation = feature.operation.clone();
        feature.operation = operation.clone();
        self.undo_stack.push(Command::EditFeature {
            feature_id: id,
            old_operation: Box::new(old_operation),
            new_operation: Box::new(operation),
        });

        self.rebuild(kb, pos);
        Ok(())
    }

    /// Reorder a feature to a new position and rebuild from the earlier
    /// of its old/new position (everything between them may re-resolve
    /// GeomRefs against a different predecessor).
    pub fn reorder_feature(
        &mut self,
        id: Uuid,
        new_position: usize,
        kb: &mut dyn KernelBundle,
    ) -> Result<(), EngineError> {
        let old_pos = self
            .tree
            .feature_index(id)
            .ok_or(EngineError::FeatureNotFound { id })?;
        self.tree.reorder_feature(id, new_position)?;
        let clamped = new_position.min(self.tree.features.len().saturating_sub(1));
        self.undo_stack.push(Command::ReorderFeature {
            feature_id: id,
            old_position: old_pos,
            new_position: clamped,
        });
        self.rebuild(kb, old_pos.min(clamped));
        Ok(())
    }

    /// Rename a feature. Purely cosmetic — does not trigger a rebuild.
    pub fn rename_feature(&mut self, id: Uuid, new_name: String) -> Result<(), EngineError> {
        let feature = self
            .tree
            .find_feature_mut(id)
            .ok_or(EngineError::FeatureNotFound { id })?;
        feature.name = new_name;
        Ok(())
    }

    /// Suppress/unsuppress a feature and rebuild.
    pub fn set_suppressed(
        &mut self,
        id: Uuid,
        suppressed: bool,
        kb: &mut dyn KernelBundle,
    ) -> Result<(), EngineError> {
        let pos = self
            .tree
            .feature_index(id)
            .ok_or(EngineError::FeatureNotFound { id })?;
        let feature = self
            .tree
            .find_feature(id)
            .ok_or(EngineError::FeatureNotFound { id })?;
        let old_suppressed = feature.suppressed;
        self.tree.set_suppressed(id, suppressed)?;
        self.undo_stack.push(Command::SuppressFeature {
            feature_id: id,
            old_suppressed,
            new_suppressed: suppressed,
        });
        self.rebuild(kb, pos);
        Ok(())
    }

    /// Set rollback index and rebuild.
    pub fn set_rollback(&mut self, index: Option<usize>, kb: &mut dyn KernelBundle) {
        self.tree.set_rollback(index);
        self.rebuild(kb, 0);
    }

    /// Undo the most recent command, rebuilding from the earliest position
    /// it could have affected.
    pub fn undo(&mut self, kb: &mut dyn KernelBundle) -> Result<(), EngineError> {
        let cmd = match self.undo_stack.pop_undo() {
            Some(cmd) => cmd,
            None => return Ok(()),
        };

        let rebuild_from = self.apply_inverse(&cmd)?;
        self.undo_stack.push_redo(cmd);
        self.rebuild(kb, rebuild_from);
        Ok(())
    }

    /// Redo the most recently undone command.
    pub fn redo(&mut self, kb: &mut dyn KernelBundle) -> Result<(), EngineError> {
        let cmd = match self.undo_stack.pop_redo() {
            Some(cmd) => cmd,
            None => return Ok(()),
        };

        let rebuild_from = self.apply_forward(&cmd)?;
        self.undo_stack.push_undo_only(cmd);
        self.rebuild(kb, rebuild_from);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo_stack.can_redo()
    }

    /// Replay `cmd` backwards against the tree, returning the index to
    /// rebuild from.
    fn apply_inverse(&mut self, cmd: &Command) -> Result<usize, EngineError> {
        match cmd {
            Command::AddFeature { feature, position } => {
                self.tree.remove_feature(feature.id)?;
                self.feature_results.remove(&feature.id);
                Ok((*position).min(self.tree.features.len().saturating_sub(1)))
            }
            Command::RemoveFeature { feature, position } => {
                self.tree.features.insert(*position, (**feature).clone());
                Ok(*position)
            }
            Command::EditFeature { feature_id, old_operation, .. } => {
                let pos = self
                    .tree
                    .feature_index(*feature_id)
                    .ok_or(EngineError::FeatureNotFound { id: *feature_id })?;
                let feature = self
                    .tree
                    .find_feature_mut(*feature_id)
                    .ok_or(EngineError::FeatureNotFound { id: *feature_id })?;
                feature.operation = (**old_operation).clone();
                Ok(pos)
            }
            Command::ReorderFeature { feature_id, old_position, new_position } => {
                self.tree.reorder_feature(*feature_id, *old_position)?;
                Ok((*old_position).min(*new_position))
            }
            Command::SuppressFeature { feature_id, old_suppressed, .. } => {
                let pos = self
                    .tree
                    .feature_index(*feature_id)
                    .ok_or(EngineError::FeatureNotFound { id: *feature_id })?;
                self.tree.set_suppressed(*feature_id, *old_suppressed)?;
                Ok(pos)
            }
        }
    }

    /// Replay `cmd` forwards against the tree (used by redo), returning the
    /// index to rebuild from.
    fn apply_forward(&mut self, cmd: &Command) -> Result<usize, EngineError> {
        match cmd {
            Command::AddFeature { feature, position } => {
                self.tree.features.insert(*position, (**feature).clone());
                Ok(*position)
            }
            Command::RemoveFeature { feature, position } => {
                self.tree.remove_feature(feature.id)?;
                self.feature_results.remove(&feature.id);
                Ok((*position).min(self.tree.features.len().saturating_sub(1)))
            }
            Command::EditFeature { feature_id, new_operation, .. } => {
                let pos = self
                    .tree
                    .feature_index(*feature_id)
                    .ok_or(EngineError::FeatureNotFound { id: *feature_id })?;
                let feature = self
                    .tree
                    .find_feature_mut(*feature_id)
                    .ok_or(EngineError::FeatureNotFound { id: *feature_id })?;
                feature.operation = (**new_operation).clone();
                Ok(pos)
            }
            Command::ReorderFeature { feature_id, old_position, new_position } => {
                self.tree.reorder_feature(*feature_id, *new_position)?;
                Ok((*old_position).min(*new_position))
            }
            Command::SuppressFeature { feature_id, new_suppressed, .. } => {
                let pos = self
                    .tree
                    .feature_index(*feature_id)
                    .ok_or(EngineError::FeatureNotFound { id: *feature_id })?;
                self.tree.set_suppressed(*feature_id, *new_suppressed)?;
                Ok(pos)
            }
        }
    }

    /// Rebuild the feature tree from the given index.
    fn rebuild(&mut self, kb: &mut dyn KernelBundle, from_index: usize) {
        // Clear results from the rebuild point onward
        let active = self.tree.active_features();
        for feature in active.iter().skip(from_index) {
            self.feature_results.remove(&feature.id);
        }

        let state = rebuild::rebuild(&self.tree, kb, from_index, &self.feature_results);
        self.feature_results.extend(state.feature_results);
        self.warnings = state.warnings;
        self.errors = state.errors;
    }

    /// Rebuild every active feature from scratch, discarding all cached
    /// results (§8 "rebuild determinism": re-executing the same feature
    /// list against the same inputs must reproduce byte-identical output).
    pub fn rebuild_from_scratch(&mut self, kb: &mut dyn KernelBundle) {
        self.feature_results.clear();
        self.rebuild(kb, 0);
    }

    /// Get the OpResult for a feature.
    pub fn get_result(&self, feature_id: Uuid) -> Option<&OpResult> {
        self.feature_results.get(&feature_id)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
