use crate::{api::CommentId, CommentPatch, TempId};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PendingChange {
    /// Optimistic edit or vote on a known comment; `undo` puts the comment back as it was
    /// before the change
    Patch { target: CommentId, undo: CommentPatch },

    /// Reply that only exists locally, under a temporary comment id
    Reply { temp_comment: CommentId },
}

impl PendingChange {
    pub fn target(&self) -> &CommentId {
        match self {
            PendingChange::Patch { target, .. } => target,
            PendingChange::Reply { temp_comment } => temp_comment,
        }
    }
}

/// Optimistic changes waiting for the store to confirm or refuse them, oldest first
#[derive(Clone, Debug, Default)]
pub struct PendingLedger {
    changes: Vec<(TempId, PendingChange)>,
}

impl PendingLedger {
    pub fn new() -> PendingLedger {
        PendingLedger::default()
    }

    pub fn record(&mut self, change: PendingChange) -> TempId {
        let id = TempId::new();
        self.changes.push((id, change));
        id
    }

    pub fn take(&mut self, id: TempId) -> Option<PendingChange> {
        let pos = self.changes.iter().position(|(i, _)| *i == id)?;
        Some(self.changes.remove(pos).1)
    }

    pub fn get(&self, id: TempId) -> Option<&PendingChange> {
        self.changes.iter().find(|(i, _)| *i == id).map(|(_, c)| c)
    }

    /// Makes the still-pending change `id` roll back to `restore` (for the fields `restore`
    /// sets) instead of to the state it captured, which an older change just got settled over
    pub fn hand_over(&mut self, id: TempId, restore: CommentPatch) {
        match self.changes.iter_mut().find(|(i, _)| *i == id) {
            Some((_, PendingChange::Patch { undo, .. })) => {
                *undo = restore.or(std::mem::take(undo));
            }
            _ => tracing::debug!(?id, "no pending patch to hand the rollback over to"),
        }
    }

    /// Fields of `target` that pending changes currently display, as a mask for
    /// [`CommentPatch::without`]
    pub fn touched_fields(&self, target: &CommentId) -> CommentPatch {
        self.changes
            .iter()
            .fold(CommentPatch::default(), |acc, (_, c)| match c {
                PendingChange::Patch { target: t, undo } if t == target => acc.or(undo.clone()),
                _ => acc,
            })
    }

    /// Most recent change still pending on `target`
    pub fn latest_for(&self, target: &CommentId) -> Option<TempId> {
        self.changes
            .iter()
            .rev()
            .find(|(_, c)| c.target() == target)
            .map(|(i, _)| *i)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
