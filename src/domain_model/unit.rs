use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PageSize(pub u16);

impl PageSize {
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn clamp_to(self, remaining: u64) -> PageSize {
        let remaining = u16::try_from(remaining).unwrap_or(u16::MAX);
        PageSize(self.0.min(remaining))
    }

    pub fn as_usize(&self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
