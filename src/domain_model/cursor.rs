use crate::domain_model::MessageId;
use std::fmt;

/// Pagination boundary for walking a channel's history backwards.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum PaginationCursor {
    #[default]
    Latest,
    Before(MessageId),
}

impl PaginationCursor {
    pub fn before_id(&self) -> Option<MessageId> {
        match self {
            PaginationCursor::Latest => None,
            PaginationCursor::Before(id) => Some(*id),
        }
    }

    pub fn admits(&self, id: MessageId) -> bool {
        match self {
            PaginationCursor::Latest => true,
            PaginationCursor::Before(before) => id < *before,
        }
    }
}

impl From<Option<MessageId>> for PaginationCursor {
    fn from(value: Option<MessageId>) -> Self {
        value.map_or(PaginationCursor::Latest, PaginationCursor::Before)
    }
}

impl fmt::Display for PaginationCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaginationCursor::Latest => f.write_str("latest"),
            PaginationCursor::Before(id) => write!(f, "before:{id}"),
        }
    }
}
