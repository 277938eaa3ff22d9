use std::sync::Arc;

use crate::{
    api::{CommentId, CommentRecord, Time, Vote},
    CommentStatus, NormalizedComment,
};

/// Local change to a single comment. `None` fields are left untouched.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommentPatch {
    pub body: Option<String>,
    pub stripped_body: Option<String>,
    pub updated_at: Option<Time>,
    pub deleted: Option<bool>,
    pub votes: Option<Vec<Vote>>,
    pub status: Option<CommentStatus>,
}

impl CommentPatch {
    pub fn body(body: String, stripped_body: String) -> CommentPatch {
        CommentPatch {
            body: Some(body),
            stripped_body: Some(stripped_body),
            ..CommentPatch::default()
        }
    }

    /// Everything a store answer can change on an already-known comment
    pub fn from_record(r: &CommentRecord) -> CommentPatch {
        CommentPatch {
            body: Some(r.body.clone()),
            stripped_body: Some(r.stripped_body.clone()),
            updated_at: Some(r.updated_at),
            deleted: Some(r.deleted),
            votes: Some(r.votes.clone()),
            status: Some(CommentStatus::Confirmed),
        }
    }

    /// The patch that would undo `self` once applied on `c`
    pub fn undo_for(&self, c: &NormalizedComment) -> CommentPatch {
        CommentPatch {
            body: self.body.as_ref().map(|_| c.record.body.clone()),
            stripped_body: self
                .stripped_body
                .as_ref()
                .map(|_| c.record.stripped_body.clone()),
            updated_at: self.updated_at.map(|_| c.record.updated_at),
            deleted: self.deleted.map(|_| c.record.deleted),
            votes: self.votes.as_ref().map(|_| c.record.votes.clone()),
            status: self.status.as_ref().map(|_| c.status.clone()),
        }
    }

    /// Fields set in `self` win, the others are taken from `fallback`
    pub fn or(self, fallback: CommentPatch) -> CommentPatch {
        CommentPatch {
            body: self.body.or(fallback.body),
            stripped_body: self.stripped_body.or(fallback.stripped_body),
            updated_at: self.updated_at.or(fallback.updated_at),
            deleted: self.deleted.or(fallback.deleted),
            votes: self.votes.or(fallback.votes),
            status: self.status.or(fallback.status),
        }
    }

    /// Same patch, minus the fields `mask` sets
    pub fn without(self, mask: &CommentPatch) -> CommentPatch {
        CommentPatch {
            body: self.body.filter(|_| mask.body.is_none()),
            stripped_body: self.stripped_body.filter(|_| mask.stripped_body.is_none()),
            updated_at: self.updated_at.filter(|_| mask.updated_at.is_none()),
            deleted: self.deleted.filter(|_| mask.deleted.is_none()),
            votes: self.votes.filter(|_| mask.votes.is_none()),
            status: self.status.filter(|_| mask.status.is_none()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == CommentPatch::default()
    }

    pub fn apply_to(&self, c: &NormalizedComment) -> NormalizedComment {
        let mut res = c.clone();
        if let Some(body) = &self.body {
            res.record.body = body.clone();
        }
        if let Some(stripped_body) = &self.stripped_body {
            res.record.stripped_body = stripped_body.clone();
        }
        if let Some(updated_at) = self.updated_at {
            res.record.updated_at = updated_at;
        }
        if let Some(deleted) = self.deleted {
            res.record.deleted = deleted;
        }
        if let Some(votes) = &self.votes {
            res.record.votes = votes.clone();
        }
        if let Some(status) = &self.status {
            res.status = status.clone();
        }
        res
    }
}

/// Returns `roots` with the comment `target` replaced by `f(target)`.
///
/// Every ancestor of `target` is a new node, every other subtree is the very same `Arc` as in
/// `roots`, so that identity tells what changed. When `target` is nowhere in the tree, the
/// result is `roots` unchanged: it may well come from a fetch not reflected locally yet.
pub fn replace_node<F>(
    roots: &[Arc<NormalizedComment>],
    target: &CommentId,
    f: F,
) -> Vec<Arc<NormalizedComment>>
where
    F: FnOnce(&NormalizedComment) -> NormalizedComment,
{
    match NormalizedComment::path_in(roots, target) {
        Some(path) => splice(roots, &path, |siblings, i| {
            siblings[i] = Arc::new(f(&siblings[i]));
        }),
        None => {
            tracing::debug!(%target, "comment to update is not in the thread, ignoring");
            roots.to_vec()
        }
    }
}

/// Rebuilds the comments along `path` after `f` changed the list holding its last comment,
/// sharing everything else with `roots`
fn splice<F>(
    roots: &[Arc<NormalizedComment>],
    path: &[usize],
    f: F,
) -> Vec<Arc<NormalizedComment>>
where
    F: FnOnce(&mut Vec<Arc<NormalizedComment>>, usize),
{
    let Some((&last, up)) = path.split_last() else {
        return roots.to_vec();
    };
    // ancestors[j] sits at index up[j] of the replies of ancestors[j - 1], or of the roots
    let mut ancestors = Vec::with_capacity(up.len());
    let mut siblings = roots;
    for &i in up {
        let c = &siblings[i];
        ancestors.push(c);
        siblings = &c.replies;
    }

    let mut level = siblings.to_vec();
    f(&mut level, last);
    for (j, &i) in up.iter().enumerate().rev() {
        let mut c = ancestors[j].without_replies();
        c.replies = level;
        level = match j {
            0 => roots.to_vec(),
            _ => ancestors[j - 1].replies.clone(),
        };
        level[i] = Arc::new(c);
    }
    level
}

/// Merges `patch` into the comment `target`, see [`replace_node`]
pub fn update_node(
    roots: &[Arc<NormalizedComment>],
    target: &CommentId,
    patch: &CommentPatch,
) -> Vec<Arc<NormalizedComment>> {
    replace_node(roots, target, |c| patch.apply_to(c))
}

/// Adds `comment` to the thread: under its parent when the parent is in the tree, as the last
/// root otherwise. A comment whose id is already in the tree replaces the existing node and
/// keeps its replies.
pub fn insert_reply(
    roots: &[Arc<NormalizedComment>],
    comment: NormalizedComment,
) -> Vec<Arc<NormalizedComment>> {
    if NormalizedComment::find_in(roots, comment.id()).is_some() {
        let id = comment.id().clone();
        return replace_node(roots, &id, move |existing| {
            let mut comment = comment;
            comment.replies = existing.replies.clone();
            comment
        });
    }
    match comment.parent_id() {
        Some(parent) if NormalizedComment::find_in(roots, parent).is_some() => {
            let parent = parent.clone();
            replace_node(roots, &parent, move |p| {
                let mut p = p.clone();
                p.replies.push(Arc::new(comment));
                p
            })
        }
        _ => {
            let mut res = roots.to_vec();
            res.push(Arc::new(comment));
            res
        }
    }
}

/// Returns `roots` without the comment `target` and its replies, sharing every subtree that
/// is not an ancestor of `target`
pub fn remove_node(
    roots: &[Arc<NormalizedComment>],
    target: &CommentId,
) -> Vec<Arc<NormalizedComment>> {
    match NormalizedComment::path_in(roots, target) {
        Some(path) => splice(roots, &path, |siblings, i| {
            siblings.remove(i);
        }),
        None => {
            tracing::debug!(%target, "comment to remove is not in the thread, ignoring");
            roots.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{CommentRecord, UserId},
        normalize,
    };

    fn scenario_a() -> Vec<Arc<NormalizedComment>> {
        normalize(
            vec![
                CommentRecord::stub("1", None),
                CommentRecord::stub("2", Some("1")),
                CommentRecord::stub("3", Some("2")),
            ],
            &UserId::stub(),
        )
    }

    fn edited() -> CommentPatch {
        CommentPatch {
            body: Some(String::from("edited")),
            ..CommentPatch::default()
        }
    }

    #[test]
    fn path_is_copied_and_the_rest_shared() {
        let before = scenario_a();
        let after = update_node(&before, &CommentId::from("2"), &edited());

        let (b1, a1) = (&before[0], &after[0]);
        let (b2, a2) = (&b1.replies[0], &a1.replies[0]);
        let (b3, a3) = (&b2.replies[0], &a2.replies[0]);
        assert_eq!(a2.record.body, "edited");
        assert!(!Arc::ptr_eq(b1, a1));
        assert!(!Arc::ptr_eq(b2, a2));
        assert!(Arc::ptr_eq(b3, a3));
        assert_eq!(b2.record.body, "", "the input tree must not change");
    }

    #[test]
    fn siblings_keep_their_identity() {
        let before = normalize(
            vec![
                CommentRecord::stub("1", None),
                CommentRecord::stub("2", Some("1")),
                CommentRecord::stub("3", Some("1")),
                CommentRecord::stub("4", None),
            ],
            &UserId::stub(),
        );
        let after = update_node(&before, &CommentId::from("2"), &edited());
        assert!(Arc::ptr_eq(&before[0].replies[1], &after[0].replies[1]));
        assert!(Arc::ptr_eq(&before[1], &after[1]));
    }

    #[test]
    fn missing_target_changes_nothing() {
        let before = scenario_a();
        let after = update_node(&before, &CommentId::from("nope"), &edited());
        assert_eq!(before.len(), after.len());
        assert!(Arc::ptr_eq(&before[0], &after[0]));
    }

    #[test]
    fn undo_restores_touched_fields_only() {
        let roots = scenario_a();
        let patch = CommentPatch {
            deleted: Some(true),
            ..edited()
        };
        let undo = patch.undo_for(&roots[0]);
        assert_eq!(undo.body, Some(String::new()));
        assert_eq!(undo.deleted, Some(false));
        assert_eq!(undo.votes, None);

        let patched = update_node(&roots, &CommentId::from("1"), &patch);
        let restored = update_node(&patched, &CommentId::from("1"), &undo);
        assert_eq!(restored, roots);
    }

    #[test]
    fn without_drops_masked_fields() {
        let patch = CommentPatch {
            votes: Some(Vec::new()),
            deleted: Some(true),
            ..CommentPatch::body(String::from("b"), String::from("b"))
        };
        let mask = CommentPatch {
            body: Some(String::new()),
            deleted: Some(false),
            ..CommentPatch::default()
        };
        let left = patch.without(&mask);
        assert_eq!(left.body, None);
        assert_eq!(left.deleted, None);
        assert_eq!(left.stripped_body.as_deref(), Some("b"));
        assert_eq!(left.votes, Some(Vec::new()));
        assert!(!left.is_empty());
        let everything = CommentPatch::from_record(&CommentRecord::stub("1", None));
        assert!(left.without(&everything).is_empty());
    }

    #[test]
    fn or_prefers_set_fields() {
        let merged = CommentPatch::body(String::from("a"), String::from("a")).or(CommentPatch {
            body: Some(String::from("b")),
            deleted: Some(true),
            ..CommentPatch::default()
        });
        assert_eq!(merged.body.as_deref(), Some("a"));
        assert_eq!(merged.deleted, Some(true));
        assert_eq!(merged.votes, None);
    }

    #[test]
    fn deep_chains_are_rebuilt_without_recursing() {
        let mut records = vec![CommentRecord::stub("0", None)];
        for i in 1..100_000 {
            records.push(CommentRecord::stub(
                &i.to_string(),
                Some(&(i - 1).to_string()),
            ));
        }
        let roots = normalize(records, &UserId::stub());
        let deepest = CommentId::from("99999");

        let after = update_node(&roots, &deepest, &edited());
        assert_eq!(
            NormalizedComment::find_in(&after, &deepest).map(|c| &c.record.body as &str),
            Some("edited"),
        );
        assert!(!Arc::ptr_eq(&roots[0], &after[0]));

        let removed = remove_node(&after, &CommentId::from("50000"));
        assert_eq!(NormalizedComment::ids_in(&removed).len(), 50_000);
    }

    #[test]
    fn insert_under_parent() {
        let roots = scenario_a();
        let reply = NormalizedComment::new(CommentRecord::stub("4", Some("2")), &UserId::stub());
        let after = insert_reply(&roots, reply);
        assert_eq!(
            NormalizedComment::ids_in(&after),
            ["1", "2", "3", "4"].map(CommentId::from),
        );
        assert_eq!(after[0].replies[0].replies[1].id(), &CommentId::from("4"));
        assert!(Arc::ptr_eq(
            &roots[0].replies[0].replies[0],
            &after[0].replies[0].replies[0],
        ));
    }

    #[test]
    fn insert_without_known_parent_appends_root() {
        let roots = scenario_a();
        let orphan = NormalizedComment::new(CommentRecord::stub("9", Some("8")), &UserId::stub());
        let after = insert_reply(&roots, orphan);
        assert_eq!(after.len(), 2);
        assert_eq!(after[1].id(), &CommentId::from("9"));
    }

    #[test]
    fn insert_existing_id_replaces_and_keeps_replies() {
        let roots = scenario_a();
        let mut record = CommentRecord::stub("2", Some("1"));
        record.body = String::from("fresh");
        let after = insert_reply(&roots, NormalizedComment::new(record, &UserId::stub()));
        assert_eq!(NormalizedComment::ids_in(&after).len(), 3);
        assert_eq!(after[0].replies[0].record.body, "fresh");
        assert!(Arc::ptr_eq(
            &roots[0].replies[0].replies[0],
            &after[0].replies[0].replies[0],
        ));
    }

    #[test]
    fn remove_drops_subtree_and_keeps_siblings() {
        let roots = normalize(
            vec![
                CommentRecord::stub("1", None),
                CommentRecord::stub("2", Some("1")),
                CommentRecord::stub("3", Some("2")),
                CommentRecord::stub("4", Some("1")),
            ],
            &UserId::stub(),
        );
        let after = remove_node(&roots, &CommentId::from("2"));
        assert_eq!(
            NormalizedComment::ids_in(&after),
            ["1", "4"].map(CommentId::from),
        );
        assert!(Arc::ptr_eq(&roots[0].replies[1], &after[0].replies[0]));
        assert_eq!(remove_node(&after, &CommentId::from("2")), after);
    }
}
