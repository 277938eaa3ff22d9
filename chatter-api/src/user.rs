use crate::Error;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn stub() -> UserId {
        UserId(String::from("stub-user"))
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> UserId {
        UserId(String::from(s))
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Author {
    pub username: String,
    pub avatar: Option<String>,
    pub verified: bool,
}

impl Author {
    pub fn stub() -> Author {
        Author {
            username: String::from("stub"),
            avatar: None,
            verified: false,
        }
    }

    // See comments on other `validate` functions throughout chatter-api
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.username)?;
        if let Some(avatar) = &self.avatar {
            crate::validate_string(avatar)?;
        }
        Ok(())
    }
}
