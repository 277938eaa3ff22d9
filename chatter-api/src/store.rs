use async_trait::async_trait;

use crate::{
    CommentId, CommentPayload, CommentRecord, Error, PostId, SortKey, UserId, Vote, VoteKind,
};

/// The remote service holding the authoritative comment records.
///
/// Implementations do the ranking and the filtering. Callers only ever see flat records and
/// are in charge of turning them into threads.
#[async_trait(?Send)]
pub trait CommentStore {
    async fn fetch_comments_sorted(
        &self,
        sort: SortKey,
        post: &PostId,
    ) -> Result<Vec<CommentRecord>, Error>;

    /// Server-side filter over the comments of `post`, ranked by `sort`
    async fn search_comments(
        &self,
        term: &str,
        sort: SortKey,
        post: &PostId,
    ) -> Result<Vec<CommentRecord>, Error>;

    async fn create_or_update_comment(&self, payload: CommentPayload)
        -> Result<CommentRecord, Error>;

    /// Sets (or clears, with `None`) the vote of `user` on `comment`, returning the full vote
    /// set of the comment afterwards
    async fn mutate_vote(
        &self,
        comment: &CommentId,
        user: &UserId,
        kind: Option<VoteKind>,
    ) -> Result<Vec<Vote>, Error>;
}
