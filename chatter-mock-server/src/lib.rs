use std::cmp::Reverse;

use async_trait::async_trait;
use chatter_api::{
    CommentId, CommentPayload, CommentRecord, CommentStore, Error, PostId, SortKey, UserId, Vote,
    VoteKind,
};
use parking_lot::Mutex;

/// In-memory comment store, ranking and filtering the way the real service does
#[derive(Debug, Default)]
pub struct MockServer {
    records: Mutex<Vec<CommentRecord>>,
    fail_next: Mutex<Option<Error>>,
    next_id: Mutex<usize>,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer::default()
    }

    pub fn from_records(records: Vec<CommentRecord>) -> MockServer {
        MockServer {
            records: Mutex::new(records),
            ..MockServer::default()
        }
    }

    /// Makes the next store call, whichever it is, fail with `err`
    pub fn fail_next(&self, err: Error) {
        *self.fail_next.lock() = Some(err);
    }

    /// Current content of the store, in insertion order
    pub fn test_records(&self) -> Vec<CommentRecord> {
        self.records.lock().clone()
    }

    pub fn test_num_records(&self) -> usize {
        self.records.lock().len()
    }

    fn check_failure(&self) -> Result<(), Error> {
        match self.fail_next.lock().take() {
            Some(e) => {
                tracing::debug!(err = %e, "failing store call on purpose");
                Err(e)
            }
            None => Ok(()),
        }
    }

    fn sorted<F>(&self, post: &PostId, sort: SortKey, filter: F) -> Vec<CommentRecord>
    where
        F: Fn(&CommentRecord) -> bool,
    {
        let mut res = self
            .records
            .lock()
            .iter()
            .filter(|r| r.post_id == *post && filter(r))
            .cloned()
            .collect::<Vec<_>>();
        sort_records(&mut res, sort);
        res
    }

    fn new_comment_id(&self) -> CommentId {
        let mut next_id = self.next_id.lock();
        *next_id += 1;
        CommentId(format!("mock-{next_id}"))
    }
}

fn controversy(r: &CommentRecord) -> f64 {
    let (ups, downs) = (r.upvotes() as f64, r.downvotes() as f64);
    let (min, max) = if ups < downs { (ups, downs) } else { (downs, ups) };
    if max == 0.0 {
        return 0.0;
    }
    (ups + downs).powf(min / max)
}

/// Ranks `records` in place; ties keep their relative order
pub fn sort_records(records: &mut [CommentRecord], sort: SortKey) {
    match sort {
        SortKey::Best => records.sort_by_key(|r| (Reverse(r.score()), Reverse(r.created_at))),
        SortKey::New => records.sort_by_key(|r| Reverse(r.created_at)),
        SortKey::Old => records.sort_by_key(|r| r.created_at),
        SortKey::Controversial => {
            records.sort_by(|a, b| controversy(b).total_cmp(&controversy(a)))
        }
    }
}

#[async_trait(?Send)]
impl CommentStore for MockServer {
    async fn fetch_comments_sorted(
        &self,
        sort: SortKey,
        post: &PostId,
    ) -> Result<Vec<CommentRecord>, Error> {
        self.check_failure()?;
        Ok(self.sorted(post, sort, |_| true))
    }

    async fn search_comments(
        &self,
        term: &str,
        sort: SortKey,
        post: &PostId,
    ) -> Result<Vec<CommentRecord>, Error> {
        self.check_failure()?;
        chatter_api::validate_string(term)?;
        let term = term.to_lowercase();
        Ok(self.sorted(post, sort, |r| {
            r.stripped_body.to_lowercase().contains(&term)
        }))
    }

    async fn create_or_update_comment(
        &self,
        payload: CommentPayload,
    ) -> Result<CommentRecord, Error> {
        self.check_failure()?;
        payload.validate()?;
        let now = chrono::Utc::now();
        match payload {
            CommentPayload::Create {
                post_id,
                parent_id,
                creator_id,
                author,
                body,
                stripped_body,
            } => {
                if let Some(parent) = &parent_id {
                    if !self.records.lock().iter().any(|r| r.id == *parent) {
                        return Err(Error::NotFound(parent.clone()));
                    }
                }
                let id = self.new_comment_id();
                let record = CommentRecord {
                    slug: id.0.clone(),
                    id,
                    parent_id,
                    post_id,
                    creator_id,
                    author,
                    body,
                    stripped_body,
                    created_at: now,
                    updated_at: now,
                    deleted: false,
                    votes: Vec::new(),
                };
                self.records.lock().push(record.clone());
                Ok(record)
            }
            CommentPayload::Update {
                id,
                body,
                stripped_body,
            } => {
                let mut records = self.records.lock();
                let r = records
                    .iter_mut()
                    .find(|r| r.id == id)
                    .ok_or(Error::NotFound(id))?;
                r.body = body;
                r.stripped_body = stripped_body;
                r.updated_at = now;
                Ok(r.clone())
            }
        }
    }

    async fn mutate_vote(
        &self,
        comment: &CommentId,
        user: &UserId,
        kind: Option<VoteKind>,
    ) -> Result<Vec<Vote>, Error> {
        self.check_failure()?;
        let mut records = self.records.lock();
        let r = records
            .iter_mut()
            .find(|r| r.id == *comment)
            .ok_or_else(|| Error::NotFound(comment.clone()))?;
        r.votes.retain(|v| v.user_id != *user);
        if let Some(kind) = kind {
            r.votes.push(Vote {
                user_id: user.clone(),
                kind,
            });
        }
        Ok(r.votes.clone())
    }
}
