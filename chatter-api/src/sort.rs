use std::{fmt, str::FromStr};

use crate::Error;

/// Orders the comment store knows how to rank a thread by. The ranking itself happens in the
/// store, clients only pass the key through.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Best,
    New,
    Old,
    Controversial,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Best,
        SortKey::New,
        SortKey::Old,
        SortKey::Controversial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Best => "best",
            SortKey::New => "new",
            SortKey::Old => "old",
            SortKey::Controversial => "controversial",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<SortKey, Error> {
        SortKey::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownSortKey(String::from(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_keys() {
        for k in SortKey::ALL {
            assert_eq!(k.as_str().parse::<SortKey>(), Ok(k));
        }
        assert_eq!("  NEW ".parse::<SortKey>(), Ok(SortKey::New));
        assert_eq!(
            "hot".parse::<SortKey>(),
            Err(Error::UnknownSortKey(String::from("hot"))),
        );
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SortKey::Controversial).unwrap(),
            r#""controversial""#,
        );
    }
}
