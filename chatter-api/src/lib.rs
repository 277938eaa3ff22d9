use chrono::Utc;

mod comment;
pub use comment::{CommentId, CommentPayload, CommentRecord, PostId, Vote, VoteKind};

mod error;
pub use error::Error;

mod sort;
pub use sort::SortKey;

mod store;
pub use store::CommentStore;

mod user;
pub use user::{Author, UserId};

pub use uuid::Uuid;
pub type Time = chrono::DateTime<Utc>;

// Strings coming from the store end up in rich-text renderers and search indexes, neither of
// which cope with embedded null bytes
pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_bytes_are_rejected() {
        assert_eq!(validate_string("hello"), Ok(()));
        assert_eq!(
            validate_string("hel\0lo"),
            Err(Error::NullByteInString(String::from("hel\0lo"))),
        );
    }
}
