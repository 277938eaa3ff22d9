use std::sync::Arc;

use crate::NormalizedComment;

/// A reply as shown by layouts that cannot indent: no nested replies, and an explicit pointer
/// to the comment it answers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FlatComment {
    /// The reply itself, with its own replies stripped
    pub comment: NormalizedComment,

    /// The comment this reply answers. Shared with the canonical tree, which is immutable, so
    /// the flat view cannot corrupt it.
    pub replying_to: Arc<NormalizedComment>,
}

/// Every reply below `root`, at any depth, in the order a fully expanded nested view reads
/// them top to bottom. `root` itself is not part of the result.
pub fn flatten_replies(root: &Arc<NormalizedComment>) -> Vec<FlatComment> {
    let mut res = Vec::new();
    let mut stack = root
        .replies
        .iter()
        .rev()
        .map(|r| (r, root))
        .collect::<Vec<_>>();
    while let Some((c, parent)) = stack.pop() {
        res.push(FlatComment {
            comment: c.without_replies(),
            replying_to: parent.clone(),
        });
        stack.extend(c.replies.iter().rev().map(|r| (r, c)));
    }
    res
}

/// Replies of all of `roots`, flattened one root after the other
pub fn flatten(roots: &[Arc<NormalizedComment>]) -> Vec<FlatComment> {
    roots.iter().flat_map(flatten_replies).collect()
}

/// Each root along with its flattened replies, which is what the mobile thread renders
pub fn flatten_thread(
    roots: &[Arc<NormalizedComment>],
) -> Vec<(Arc<NormalizedComment>, Vec<FlatComment>)> {
    roots
        .iter()
        .map(|r| (r.clone(), flatten_replies(r)))
        .collect()
}
