use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("range starting at {start} is not satisfiable for length {length}")]
    Unsatisfiable { start: u64, length: u64 },

    #[error("invalid range: {reason}")]
    Invalid { reason: String },
}

impl RangeError {
    pub fn invalid<S: ToString>(str: S) -> Self {
        Self::Invalid { reason: str.to_string() }
    }

    /// `Content-Range` value sent with a 416 response: `*/<length>`.
    pub fn content_range(&self) -> Option<String> {
        match self {
            Self::Unsatisfiable { length, .. } => Some(format!("*/{length}")),
            Self::Invalid { .. } => None,
        }
    }

    pub fn is_unsatisfiable(&self) -> bool {
        matches!(self, Self::Unsatisfiable { .. })
    }
}
