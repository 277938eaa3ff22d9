use std::sync::Arc;

use crate::api::{CommentId, CommentRecord, UserId, Uuid};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TempId(pub Uuid);

impl TempId {
    pub fn new() -> TempId {
        TempId(Uuid::new_v4())
    }
}

impl Default for TempId {
    fn default() -> TempId {
        TempId::new()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CommentStatus {
    /// As known by the comment store
    Confirmed,

    /// Locally changed, the store has not acknowledged the change yet
    Pending { temp_id: TempId },
}

impl CommentStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, CommentStatus::Pending { .. })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NormalizedComment {
    pub record: CommentRecord,

    /// Whether the comment was written by the author of the post the thread hangs under
    pub is_op: bool,

    pub status: CommentStatus,

    /// Direct replies, in the order they were encountered in the store's answer
    pub replies: Vec<Arc<NormalizedComment>>,
}

impl NormalizedComment {
    pub fn new(record: CommentRecord, thread_author: &UserId) -> NormalizedComment {
        NormalizedComment {
            is_op: record.creator_id == *thread_author,
            record,
            status: CommentStatus::Confirmed,
            replies: Vec::new(),
        }
    }

    pub fn id(&self) -> &CommentId {
        &self.record.id
    }

    pub fn parent_id(&self) -> Option<&CommentId> {
        self.record.parent_id.as_ref()
    }

    /// Copy of this node with its replies stripped
    pub fn without_replies(&self) -> NormalizedComment {
        NormalizedComment {
            record: self.record.clone(),
            is_op: self.is_op,
            status: self.status.clone(),
            replies: Vec::new(),
        }
    }

    pub fn find_in<'a>(
        comments: &'a [Arc<NormalizedComment>],
        id: &CommentId,
    ) -> Option<&'a Arc<NormalizedComment>> {
        let mut stack = comments.iter().rev().collect::<Vec<_>>();
        while let Some(c) = stack.pop() {
            if c.id() == id {
                return Some(c);
            }
            stack.extend(c.replies.iter().rev());
        }
        None
    }

    /// Indices leading to `id`: first among `comments`, then among the replies of each
    /// comment on the way
    pub fn path_in(comments: &[Arc<NormalizedComment>], id: &CommentId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut stack = comments
            .iter()
            .enumerate()
            .rev()
            .map(|(i, c)| (0, i, c))
            .collect::<Vec<_>>();
        while let Some((depth, i, c)) = stack.pop() {
            // Pre-order: the last comment seen one level up is the parent of `c`
            path.truncate(depth);
            path.push(i);
            if c.id() == id {
                return Some(path);
            }
            stack.extend(
                c.replies
                    .iter()
                    .enumerate()
                    .rev()
                    .map(|(i, r)| (depth + 1, i, r)),
            );
        }
        None
    }

    /// Ids of every comment in the forest, in the order a fully expanded thread reads
    pub fn ids_in(comments: &[Arc<NormalizedComment>]) -> Vec<CommentId> {
        let mut res = Vec::new();
        let mut stack = comments.iter().rev().collect::<Vec<_>>();
        while let Some(c) = stack.pop() {
            res.push(c.id().clone());
            stack.extend(c.replies.iter().rev());
        }
        res
    }
}

// Long reply chains would otherwise be dropped one stack frame per level
impl Drop for NormalizedComment {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.replies);
        while let Some(c) = stack.pop() {
            if let Ok(mut c) = Arc::try_unwrap(c) {
                stack.append(&mut c.replies);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize;

    fn chain(depth: usize) -> Vec<Arc<NormalizedComment>> {
        let mut records = vec![CommentRecord::stub("0", None)];
        for i in 1..depth {
            records.push(CommentRecord::stub(
                &i.to_string(),
                Some(&(i - 1).to_string()),
            ));
        }
        normalize(records, &UserId::stub())
    }

    #[test]
    fn path_leads_to_the_comment() {
        let roots = normalize(
            vec![
                CommentRecord::stub("1", None),
                CommentRecord::stub("2", Some("1")),
                CommentRecord::stub("3", Some("1")),
                CommentRecord::stub("4", Some("3")),
                CommentRecord::stub("5", None),
            ],
            &UserId::stub(),
        );
        assert_eq!(
            NormalizedComment::path_in(&roots, &CommentId::from("4")),
            Some(vec![0, 1, 0]),
        );
        assert_eq!(
            NormalizedComment::path_in(&roots, &CommentId::from("5")),
            Some(vec![1]),
        );
        assert_eq!(NormalizedComment::path_in(&roots, &CommentId::from("6")), None);
        assert_eq!(
            NormalizedComment::find_in(&roots, &CommentId::from("4")).map(|c| c.id()),
            Some(&CommentId::from("4")),
        );
    }

    #[test]
    fn deep_chains_are_searched_and_dropped_without_recursing() {
        let roots = chain(100_000);
        let deepest = CommentId::from("99999");
        assert!(NormalizedComment::find_in(&roots, &deepest).is_some());
        assert_eq!(
            NormalizedComment::path_in(&roots, &deepest).map(|p| p.len()),
            Some(100_000),
        );
        drop(roots);
    }
}
