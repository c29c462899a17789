//! Optimistic concurrency primitives for versioned records.

/// Optimistic concurrency expectation for a versioned record.
///
/// The stock store's compare-and-set primitive accepts an expectation and
/// rejects the mutation when the stored version differs. Administrative
/// migrations may opt out with `Any`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (migrations, bulk seeding).
    Any,
    /// Require the record to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}
