//! Version-vector comparison.
//!
//! Each record carries a per-record monotonic counter plus a content
//! fingerprint; the pair `(version, fingerprint)` acts as the version
//! vector. Comparing two replicas of the same record classifies them
//! into exactly one of four relations.

/// Anything that exposes a `(version, fingerprint)` pair.
pub trait VersionVector {
    /// The per-record monotonic counter.
    fn version(&self) -> i64;
    /// The hex content fingerprint.
    fn fingerprint(&self) -> &str;
}

/// The relation between two replicas of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominance {
    /// Same version, same content.
    Equal,
    /// The left replica supersedes the right.
    LeftDominates,
    /// The right replica supersedes the left.
    RightDominates,
    /// Same version, different content: concurrent updates.
    Conflict,
}

impl Dominance {
    /// The relation with the operands swapped.
    pub fn flipped(self) -> Self {
        match self {
            Dominance::LeftDominates => Dominance::RightDominates,
            Dominance::RightDominates => Dominance::LeftDominates,
            other => other,
        }
    }
}

/// Classifies two replicas of one record.
///
/// Total and deterministic; swapping the operands flips dominance and
/// preserves `Equal`/`Conflict`.
pub fn compare<L, R>(left: &L, right: &R) -> Dominance
where
    L: VersionVector + ?Sized,
    R: VersionVector + ?Sized,
{
    if left.version() > right.version() {
        return Dominance::LeftDominates;
    }
    if left.version() < right.version() {
        return Dominance::RightDominates;
    }
    if left.fingerprint() == right.fingerprint() {
        Dominance::Equal
    } else {
        Dominance::Conflict
    }
}
