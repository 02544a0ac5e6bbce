//! Record metadata pairs.

/// One metadata pair attached to a record.
///
/// Keys are not required to be unique; the sequence order is
/// significant and preserved end to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// The pair key.
    pub key: String,
    /// The pair value.
    pub value: String,
}

impl Metadata {
    /// Creates a pair.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parses user-supplied metadata lines into ordered pairs.
    ///
    /// Each line is either `key:value`, or a bare value whose key
    /// becomes its position in the input. Lines with more than one
    /// colon are skipped.
    pub fn parse_lines<S: AsRef<str>>(lines: &[S]) -> Vec<Metadata> {
        let mut pairs = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            let parts: Vec<&str> = line.as_ref().split(':').collect();
            match parts.as_slice() {
                [key, value] => pairs.push(Metadata::new(*key, *value)),
                [value] => pairs.push(Metadata::new(i.to_string(), *value)),
                _ => continue,
            }
        }
        pairs
    }
}
