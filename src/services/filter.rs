//! Session list filtering and grouping for the sidebar.
//!
//! Everything here is a pure function of the sessions, the selected filter,
//! the query and "now". Day boundaries follow the timezone of `now`.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone};

use crate::models::Session;

const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateFilter {
    #[default]
    All,
    Today,
    Week,
    Month,
}

impl DateFilter {
    pub const ALL: [DateFilter; 4] = [
        DateFilter::All,
        DateFilter::Today,
        DateFilter::Week,
        DateFilter::Month,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateFilter::All => "all",
            DateFilter::Today => "today",
            DateFilter::Week => "week",
            DateFilter::Month => "month",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DateFilter::All => "All Chats",
            DateFilter::Today => "Today",
            DateFilter::Week => "This Week",
            DateFilter::Month => "This Month",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all" => Some(DateFilter::All),
            "today" => Some(DateFilter::Today),
            "week" => Some(DateFilter::Week),
            "month" => Some(DateFilter::Month),
            _ => None,
        }
    }

    /// Earliest local date included by this filter, `None` for all.
    fn earliest(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            DateFilter::All => None,
            DateFilter::Today => Some(today),
            DateFilter::Week => Some(today - Days::new(7)),
            DateFilter::Month => Some(today.checked_sub_months(Months::new(1)).unwrap_or(today)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionGroup<'a> {
    pub label: String,
    pub sessions: Vec<&'a Session>,
}

/// Totals shown under the session list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub sessions: usize,
    pub messages: usize,
}

fn local_date<Tz: TimeZone>(session: &Session, now: &DateTime<Tz>) -> NaiveDate {
    session
        .updated_at
        .with_timezone(&now.timezone())
        .date_naive()
}

fn matches_query(session: &Session, query: &str) -> bool {
    session.title.to_lowercase().contains(query)
        || session
            .messages
            .iter()
            .any(|m| m.content.to_lowercase().contains(query))
}

/// Sessions updated within `filter` whose title or messages contain `query`
/// (case-insensitive). A blank query matches everything. Order is kept.
pub fn filter_sessions<'a, Tz: TimeZone>(
    sessions: &'a [Session],
    filter: DateFilter,
    query: &str,
    now: &DateTime<Tz>,
) -> Vec<&'a Session> {
    let earliest = filter.earliest(now.date_naive());
    let query = (!query.trim().is_empty()).then(|| query.to_lowercase());

    sessions
        .iter()
        .filter(|s| earliest.map_or(true, |earliest| local_date(s, now) >= earliest))
        .filter(|s| query.as_deref().map_or(true, |q| matches_query(s, q)))
        .collect()
}

/// Sidebar heading for a session updated at `updated_at`.
pub fn date_label<Tz: TimeZone>(updated_at: &DateTime<chrono::Utc>, now: &DateTime<Tz>) -> String {
    let today = now.date_naive();
    let date = updated_at.with_timezone(&now.timezone()).date_naive();

    if date >= today {
        "Today".to_string()
    } else if date >= today - Days::new(1) {
        "Yesterday".to_string()
    } else if date >= today - Days::new(7) {
        "This Week".to_string()
    } else if date.year() == today.year() {
        date.format("%b %-d").to_string()
    } else {
        date.format("%b %-d, %Y").to_string()
    }
}

/// Bucket already-filtered sessions under date headings. Groups appear in
/// the order their first session appears, and each keeps input order.
pub fn group_sessions<'a, Tz: TimeZone>(
    sessions: &[&'a Session],
    now: &DateTime<Tz>,
) -> Vec<SessionGroup<'a>> {
    let mut groups: Vec<SessionGroup<'a>> = Vec::new();
    for &session in sessions {
        let label = date_label(&session.updated_at, now);
        match groups.iter_mut().find(|g| g.label == label) {
            Some(group) => group.sessions.push(session),
            None => groups.push(SessionGroup {
                label,
                sessions: vec![session],
            }),
        }
    }
    groups
}

/// Result count for every filter chip under the current query.
pub fn filter_counts<Tz: TimeZone>(
    sessions: &[Session],
    query: &str,
    now: &DateTime<Tz>,
) -> Vec<(DateFilter, usize)> {
    DateFilter::ALL
        .iter()
        .map(|&filter| (filter, filter_sessions(sessions, filter, query, now).len()))
        .collect()
}

pub fn session_stats(sessions: &[Session]) -> SessionStats {
    SessionStats {
        sessions: sessions.len(),
        messages: sessions.iter().map(|s| s.messages.len()).sum(),
    }
}

/// Start of the last message, for the line under a session title.
pub fn message_preview(session: &Session) -> Option<String> {
    let last = session.last_message()?;
    let head: String = last.content.chars().take(PREVIEW_CHARS).collect();
    Some(format!("{}...", head))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::session;
    use crate::models::Message;
    use chrono::{Duration, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 15, 30, 0).unwrap()
    }

    fn sample() -> Vec<Session> {
        let now = now();
        let mut rust = session("a", "Rust lifetimes", now - Duration::hours(2));
        rust.messages.push(Message::user("Explain the BORROW checker"));
        vec![
            rust,
            session("b", "Trip plan", now - Duration::days(1)),
            session("c", "Recipes", now - Duration::days(5)),
            session("d", "Quantum", now - Duration::days(20)),
            session("e", "Old stuff", now - Duration::days(40)),
            session("f", "Ancient", Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap()),
        ]
    }

    fn ids(sessions: &[&Session]) -> Vec<String> {
        sessions.iter().map(|s| s.id.clone()).collect()
    }

    #[test]
    fn test_month_filter_example() {
        let now = now();
        let sessions = vec![
            session("a", "x", now),
            session("b", "y", now - Duration::days(40)),
        ];
        let filtered = filter_sessions(&sessions, DateFilter::Month, "", &now);
        assert_eq!(ids(&filtered), vec!["a"]);
    }

    #[test]
    fn test_date_filters() {
        let sessions = sample();
        let now = now();
        assert_eq!(ids(&filter_sessions(&sessions, DateFilter::Today, "", &now)), vec!["a"]);
        assert_eq!(
            ids(&filter_sessions(&sessions, DateFilter::Week, "", &now)),
            vec!["a", "b", "c"]
        );
        assert_eq!(
            ids(&filter_sessions(&sessions, DateFilter::Month, "", &now)),
            vec!["a", "b", "c", "d"]
        );
        assert_eq!(filter_sessions(&sessions, DateFilter::All, "", &now).len(), 6);
    }

    #[test]
    fn test_query_matches_title_or_message_case_insensitive() {
        let sessions = sample();
        let now = now();
        assert_eq!(ids(&filter_sessions(&sessions, DateFilter::All, "borrow", &now)), vec!["a"]);
        assert_eq!(ids(&filter_sessions(&sessions, DateFilter::All, "TRIP", &now)), vec!["b"]);
        assert_eq!(filter_sessions(&sessions, DateFilter::All, "   ", &now).len(), 6);
        assert!(filter_sessions(&sessions, DateFilter::Today, "trip", &now).is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let sessions = sample();
        let now = now();
        for filter in DateFilter::ALL {
            for query in ["", "r", "plan"] {
                let once: Vec<Session> = filter_sessions(&sessions, filter, query, &now)
                    .into_iter()
                    .cloned()
                    .collect();
                let twice = filter_sessions(&once, filter, query, &now);
                assert_eq!(ids(&twice), once.iter().map(|s| s.id.clone()).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_group_labels() {
        let sessions = sample();
        let now = now();
        let filtered = filter_sessions(&sessions, DateFilter::All, "", &now);
        let groups = group_sessions(&filtered, &now);
        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Today", "Yesterday", "This Week", "Sep 29", "Sep 9", "Mar 2, 2025"]);
    }

    #[test]
    fn test_grouping_partitions_exactly() {
        let now = now();
        let mut sessions = sample();
        sessions.push(session("g", "Also today", now - Duration::minutes(5)));
        let filtered = filter_sessions(&sessions, DateFilter::All, "", &now);
        let groups = group_sessions(&filtered, &now);

        let flattened: Vec<&Session> = groups.iter().flat_map(|g| g.sessions.clone()).collect();
        assert_eq!(flattened.len(), filtered.len());
        let mut a = ids(&flattened);
        let mut b = ids(&filtered);
        a.sort();
        b.sort();
        assert_eq!(a, b);

        let today = groups.iter().find(|g| g.label == "Today").unwrap();
        assert_eq!(ids(&today.sessions), vec!["a", "g"]);
    }

    #[test]
    fn test_counts_and_stats() {
        let sessions = sample();
        let now = now();
        let counts = filter_counts(&sessions, "", &now);
        assert_eq!(
            counts,
            vec![
                (DateFilter::All, 6),
                (DateFilter::Today, 1),
                (DateFilter::Week, 3),
                (DateFilter::Month, 4),
            ]
        );
        assert_eq!(
            session_stats(&sessions),
            SessionStats {
                sessions: 6,
                messages: 1
            }
        );
    }

    #[test]
    fn test_message_preview() {
        let sessions = sample();
        assert_eq!(
            message_preview(&sessions[0]).as_deref(),
            Some("Explain the BORROW checker...")
        );
        assert!(message_preview(&sessions[1]).is_none());

        let mut long = sessions[1].clone();
        long.messages.push(Message::assistant("é".repeat(80)));
        assert_eq!(message_preview(&long).unwrap().chars().count(), 53);
    }

    #[test]
    fn test_filter_round_trips_through_str() {
        for filter in DateFilter::ALL {
            assert_eq!(DateFilter::from_str(filter.as_str()), Some(filter));
        }
        assert_eq!(DateFilter::from_str("year"), None);
    }
}
