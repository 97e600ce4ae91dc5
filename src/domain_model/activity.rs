use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub messages: u64,
    pub active_users: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityReport {
    pub days: Vec<DailyActivity>,
    /// Records whose timestamp could not be read back.
    pub skipped: u64,
}
