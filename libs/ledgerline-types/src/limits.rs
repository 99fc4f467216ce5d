use serde::{Deserialize, Serialize};

use crate::features::UNLIMITED;

/// Snapshot answer to "may the caller add one more?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitCheck {
    pub allowed: bool,
    pub limit: i64,
    pub current: i64,
}

impl LimitCheck {
    pub fn evaluate(limit: i64, current: i64) -> Self {
        let allowed = limit == UNLIMITED || current < limit;
        Self {
            allowed,
            limit,
            current,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.limit == UNLIMITED
    }
}
