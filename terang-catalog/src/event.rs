// Events hosted at the shop or online

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use terang_backend::Direction;

use crate::forms::FormCheck;
use crate::{Entity, Validate, ValidationErrors};

pub const EVENT_ALERT: &str = "Judul, lokasi, waktu wajib.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Scheduled,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub location: String,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub rsvp_url: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Scheduled and not yet started at `now`.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.status == EventStatus::Scheduled && self.date >= now
    }
}

/// The date is kept as submitted and must be an RFC 3339 timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsvp_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_online: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsvp_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

impl Entity for Event {
    type Input = EventInput;
    type Patch = EventPatch;

    const TABLE: &'static str = "events";
    const SINGULAR: &'static str = "event";
    const PLURAL: &'static str = "events";
    const VISIBILITY_COLUMN: &'static str = "is_published";
    const ORDER_BY: &'static str = "date";
    const ORDER_DIRECTION: Direction = Direction::Asc;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Validate for EventInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        FormCheck::new(EVENT_ALERT)
            .required("title", &self.title)
            .required("location", &self.location)
            .timestamp("date", &self.date)
            .finish()
    }
}

impl Validate for EventPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        FormCheck::new(EVENT_ALERT)
            .required_if_set("title", self.title.as_deref())
            .required_if_set("location", self.location.as_deref())
            .timestamp_if_set("date", self.date.as_deref())
            .finish()
    }
}

/// Events whose title or location contains `query`, soonest first.
pub fn search_events(events: &[Event], query: &str) -> Vec<Event> {
    let needle = query.trim().to_lowercase();
    let mut found: Vec<Event> = events
        .iter()
        .filter(|e| {
            needle.is_empty()
                || format!("{} {}", e.title, e.location)
                    .to_lowercase()
                    .contains(&needle)
        })
        .cloned()
        .collect();
    found.sort_by_key(|e| e.date);
    found
}

/// Split into upcoming events and the rest.
pub fn partition_upcoming(events: Vec<Event>, now: DateTime<Utc>) -> (Vec<Event>, Vec<Event>) {
    events.into_iter().partition(|e| e.is_upcoming(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(id: &str, title: &str, location: &str, date: &str, status: &str) -> Event {
        serde_json::from_value(json!({
            "id": id,
            "title": title,
            "date": date,
            "location": location,
            "is_online": false,
            "status": status,
            "is_published": true,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z",
        }))
        .unwrap()
    }

    #[test]
    fn test_search_sorts_by_date() {
        let events = vec![
            event("b", "Bedah Buku", "Lantai 2", "2025-07-10T19:00:00+07:00", "scheduled"),
            event("a", "Cupping Session", "Bar Kopi", "2025-06-01T10:00:00Z", "scheduled"),
            event("c", "Kelas Manual Brew", "Bar Kopi", "2025-05-01T10:00:00Z", "completed"),
        ];
        let ids: Vec<_> = search_events(&events, "").iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        let ids: Vec<_> = search_events(&events, "bar kopi").iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[test]
    fn test_upcoming_split() {
        let now: DateTime<Utc> = "2025-06-15T00:00:00Z".parse().unwrap();
        let events = vec![
            event("past", "A", "X", "2025-06-01T10:00:00Z", "scheduled"),
            event("next", "B", "X", "2025-07-01T10:00:00Z", "scheduled"),
            event("off", "C", "X", "2025-07-02T10:00:00Z", "cancelled"),
        ];
        let (upcoming, rest) = partition_upcoming(events, now);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, "next");
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn test_validation_requires_time() {
        let input = EventInput {
            title: "Cupping Session".into(),
            location: "Bar Kopi".into(),
            ..Default::default()
        };
        let err = input.validate().unwrap_err();
        assert_eq!(err.to_string(), EVENT_ALERT);
        assert_eq!(err.fields(), vec!["date"]);

        let input = EventInput {
            date: "2025-06-01T10:00:00Z".into(),
            ..input
        };
        assert!(input.validate().is_ok());
    }
}
