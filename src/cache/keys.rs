//! Cache key generation

use std::fmt;

/// A structured cache key that can be displayed for logging
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Date-bounded query, Unix milliseconds
    Range {
        start: Option<i64>,
        end: Option<i64>,
    },
    /// Most recent N transactions
    Recent(i64),
}

impl CacheKey {
    pub fn range(start: Option<i64>, end: Option<i64>) -> Self {
        Self::Range { start, end }
    }

    pub fn recent(limit: i64) -> Self {
        Self::Recent(limit)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn bound(v: &Option<i64>) -> String {
            v.map(|ts| ts.to_string()).unwrap_or_else(|| "*".to_string())
        }

        match self {
            Self::Range { start, end } => write!(f, "range:{}:{}", bound(start), bound(end)),
            Self::Recent(limit) => write!(f, "recent:{}", limit),
        }
    }
}
