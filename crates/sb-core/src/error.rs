//! Index validation errors.

/// An index passed across a public boundary was out of range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} index {index} out of range (limit {limit})")]
pub struct IndexError {
    pub kind: &'static str,
    pub index: usize,
    pub limit: usize,
}

impl IndexError {
    pub const fn new(kind: &'static str, index: usize, limit: usize) -> Self {
        Self { kind, index, limit }
    }
}
