use std::fmt;

use crate::{Author, Error, Time, UserId, Uuid};

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
pub struct CommentId(pub String);

impl CommentId {
    /// Id for a comment that only exists locally until the store confirms it
    pub fn temporary() -> CommentId {
        CommentId(format!("pending-{}", Uuid::new_v4()))
    }
}

impl From<&str> for CommentId {
    fn from(s: &str) -> CommentId {
        CommentId(String::from(s))
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PostId(pub String);

impl PostId {
    pub fn stub() -> PostId {
        PostId(String::from("stub-post"))
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> PostId {
        PostId(String::from(s))
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Up,
    Down,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Vote {
    pub user_id: UserId,
    pub kind: VoteKind,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentRecord {
    pub id: CommentId,
    pub parent_id: Option<CommentId>,
    pub post_id: PostId,
    pub creator_id: UserId,
    pub author: Author,

    /// Rich content, opaque to everything but the renderer
    pub body: String,

    /// Plain-text projection of `body`, used for search and snippets
    pub stripped_body: String,

    pub created_at: Time,
    pub updated_at: Time,

    /// Tombstone: the comment keeps its place in the thread but its content is hidden
    pub deleted: bool,

    /// Order is irrelevant
    pub votes: Vec<Vote>,

    pub slug: String,
}

impl CommentRecord {
    pub fn stub(id: &str, parent_id: Option<&str>) -> CommentRecord {
        CommentRecord {
            id: CommentId::from(id),
            parent_id: parent_id.map(CommentId::from),
            post_id: PostId::stub(),
            creator_id: UserId::stub(),
            author: Author::stub(),
            body: String::new(),
            stripped_body: String::new(),
            created_at: Time::default(),
            updated_at: Time::default(),
            deleted: false,
            votes: Vec::new(),
            slug: String::from(id),
        }
    }

    pub fn upvotes(&self) -> usize {
        self.votes.iter().filter(|v| v.kind == VoteKind::Up).count()
    }

    pub fn downvotes(&self) -> usize {
        self.votes.iter().filter(|v| v.kind == VoteKind::Down).count()
    }

    pub fn score(&self) -> i64 {
        self.upvotes() as i64 - self.downvotes() as i64
    }

    pub fn vote_of(&self, user: &UserId) -> Option<VoteKind> {
        self.votes.iter().find(|v| v.user_id == *user).map(|v| v.kind)
    }

    // See comments on other `validate` functions throughout chatter-api
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.id.0)?;
        if let Some(parent) = &self.parent_id {
            crate::validate_string(&parent.0)?;
        }
        crate::validate_string(&self.post_id.0)?;
        crate::validate_string(&self.creator_id.0)?;
        self.author.validate()?;
        crate::validate_string(&self.body)?;
        crate::validate_string(&self.stripped_body)?;
        crate::validate_string(&self.slug)?;
        for v in &self.votes {
            crate::validate_string(&v.user_id.0)?;
        }
        Ok(())
    }
}

/// Body of a create-or-update call sent by the reply and edit forms
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum CommentPayload {
    Create {
        post_id: PostId,
        parent_id: Option<CommentId>,
        creator_id: UserId,
        author: Author,
        body: String,
        stripped_body: String,
    },
    Update {
        id: CommentId,
        body: String,
        stripped_body: String,
    },
}

impl CommentPayload {
    pub fn validate(&self) -> Result<(), Error> {
        let (body, stripped_body) = match self {
            CommentPayload::Create {
                post_id,
                parent_id,
                creator_id,
                author,
                body,
                stripped_body,
            } => {
                crate::validate_string(&post_id.0)?;
                if let Some(parent) = parent_id {
                    crate::validate_string(&parent.0)?;
                }
                crate::validate_string(&creator_id.0)?;
                author.validate()?;
                (body, stripped_body)
            }
            CommentPayload::Update {
                id,
                body,
                stripped_body,
            } => {
                crate::validate_string(&id.0)?;
                (body, stripped_body)
            }
        };
        if stripped_body.trim().is_empty() {
            return Err(Error::EmptyBody);
        }
        crate::validate_string(body)?;
        crate::validate_string(stripped_body)
    }
}
