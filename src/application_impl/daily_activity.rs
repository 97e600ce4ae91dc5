use crate::domain_model::*;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

/// Groups messages by calendar day, counting volume and distinct senders.
pub fn aggregate_daily(messages: &[NormalizedMessage]) -> ActivityReport {
    let mut days: BTreeMap<NaiveDate, (u64, HashSet<&str>)> = BTreeMap::new();
    let mut skipped = 0;

    for message in messages {
        let Some(day) = message.sent_on() else {
            skipped += 1;
            continue;
        };
        let (volume, senders) = days.entry(day).or_default();
        *volume += 1;
        if let Some(sender) = message.sender_id.as_deref().filter(|s| !s.is_empty()) {
            senders.insert(sender);
        }
    }

    let days = days
        .into_iter()
        .map(|(date, (messages, senders))| DailyActivity {
            date,
            messages,
            active_users: senders.len() as u64,
        })
        .collect();

    ActivityReport { days, skipped }
}

pub fn messages_on(messages: &[NormalizedMessage], date: NaiveDate) -> Vec<&NormalizedMessage> {
    let mut selected: Vec<_> = messages
        .iter()
        .filter(|m| m.sent_on() == Some(date))
        .collect();
    selected.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn message(id: i64, timestamp: &str, sender: Option<&str>) -> NormalizedMessage {
        NormalizedMessage {
            channel: ChannelId::from("pal"),
            id: MessageId(id),
            timestamp: timestamp.to_string(),
            edited_at: None,
            sender_id: sender.map(str::to_string),
            text: format!("message {id}"),
            extra: Map::new(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn counts_volume_and_distinct_senders_per_day() {
        let messages = vec![
            message(1, "2024_09_26_23_59_59", Some("a")),
            message(2, "2024_09_27_00_00_00", Some("a")),
            message(3, "2024_09_27_10_00_00", Some("b")),
            message(4, "2024_09_27_11_00_00", Some("a")),
            message(5, "2024_09_27_12_00_00", None),
        ];

        let report = aggregate_daily(&messages);

        assert_eq!(
            report.days,
            vec![
                DailyActivity {
                    date: day(2024, 9, 26),
                    messages: 1,
                    active_users: 1,
                },
                DailyActivity {
                    date: day(2024, 9, 27),
                    messages: 4,
                    active_users: 2,
                },
            ]
        );
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn skips_unreadable_timestamps() {
        let messages = vec![
            message(1, "garbage", Some("a")),
            message(2, "2024_09_27_00_00_00", Some("a")),
        ];

        let report = aggregate_daily(&messages);

        assert_eq!(report.skipped, 1);
        assert_eq!(report.days.len(), 1);
    }

    #[test]
    fn empty_input_yields_empty_report() {
        assert_eq!(aggregate_daily(&[]), ActivityReport::default());
    }

    #[test]
    fn messages_on_selects_one_day_in_time_order() {
        let messages = vec![
            message(3, "2024_09_27_10_00_00", Some("b")),
            message(1, "2024_09_26_23_59_59", Some("a")),
            message(2, "2024_09_27_00_00_00", Some("a")),
        ];

        let selected = messages_on(&messages, day(2024, 9, 27));

        let ids: Vec<_> = selected.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![MessageId(2), MessageId(3)]);
    }
}
