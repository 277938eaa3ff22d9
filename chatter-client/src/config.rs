use crate::api::SortKey;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Nested replies, indented under their parent
    #[default]
    Desktop,

    /// One level of replies per root, each pointing at the comment it answers
    Mobile,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Config {
    pub default_sort: SortKey,
    pub search_debounce_ms: u64,
    pub layout_mode: LayoutMode,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            default_sort: SortKey::Best,
            search_debounce_ms: 300,
            layout_mode: LayoutMode::Desktop,
        }
    }
}

impl Config {
    pub fn search_debounce(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.search_debounce_ms).unwrap_or(i64::MAX))
    }
}
