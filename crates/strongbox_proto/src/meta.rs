//! Per-call metadata.

/// The metadata key carrying the caller's user id.
pub const USER_ID_KEY: &str = "userid";

/// Key/value metadata attached to every call, conceptually a header
/// block. Keys may repeat; the first entry wins on lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallMeta {
    entries: Vec<(String, String)>,
}

impl CallMeta {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates metadata carrying a user id.
    pub fn with_user_id(user_id: impl Into<String>) -> Self {
        let mut meta = Self::new();
        meta.insert(USER_ID_KEY, user_id);
        meta
    }

    /// Appends an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Returns the first value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the user id entry, untrimmed.
    pub fn user_id(&self) -> Option<&str> {
        self.get(USER_ID_KEY)
    }
}
