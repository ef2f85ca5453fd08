use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{Card, Collection, Resource};
use crate::backend::models::{parse_datetime, Event, EventStatus};
use crate::backend::{OrderBy, Table};
use crate::forms::FormData;
use crate::image_upload::ImageField;
use crate::session::Identity;

pub struct Events;

/// Event fields as edited in the dialog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub location: String,
    pub meeting_link: Option<String>,
    pub poster_url: Option<String>,
    pub status: EventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
}

impl Collection for Events {
    type Row = Event;

    const TABLE: Table = Table::Events;
    const ORDER: OrderBy = OrderBy::asc("event_date");
    const NOUN: &'static str = "Event";
    const LABEL: &'static str = "events";
    const DELETED: &'static str = "Event deleted";
    const DELETE_FAILED: &'static str = "Failed to delete event";
    const CONFIRM_PROMPT: &'static str = "Are you sure you want to delete this event?";

    fn id(row: &Event) -> Uuid {
        row.id
    }

    fn card(row: &Event) -> Card {
        let location = if row.location.is_empty() {
            "No location"
        } else {
            row.location.as_str()
        };
        Card {
            id: row.id,
            title: row.title.clone(),
            subtitle: Some(format!(
                "{} · {}",
                row.event_date.format("%B %-d, %Y %-I:%M %p"),
                location
            )),
            tag: Some(row.status.as_str().to_string()),
            image_url: row.poster_url.clone(),
        }
    }
}

impl Resource for Events {
    type Draft = EventDraft;

    const CREATED: &'static str = "Event created successfully";
    const UPDATED: &'static str = "Event updated successfully";
    const SAVE_FAILED: &'static str = "Failed to save event";
    const IMAGE_FIELD: Option<ImageField<'static>> = Some(ImageField {
        name: "poster_url",
        folder: "bandipur/events",
    });

    fn default_draft(_existing: u64) -> EventDraft {
        EventDraft {
            title: String::new(),
            description: String::new(),
            event_date: Utc::now(),
            location: String::new(),
            meeting_link: None,
            poster_url: None,
            status: EventStatus::Upcoming,
            created_by: None,
        }
    }

    fn to_draft(row: &Event) -> EventDraft {
        EventDraft {
            title: row.title.clone(),
            description: row.description.clone(),
            event_date: row.event_date,
            location: row.location.clone(),
            meeting_link: row.meeting_link.clone(),
            poster_url: row.poster_url.clone(),
            status: row.status,
            created_by: row.created_by,
        }
    }

    fn draft_from_form(form: &FormData) -> Result<EventDraft, String> {
        let title = form.required("title", "Title")?;
        let event_date = match form.non_empty("event_date") {
            Some(raw) => parse_datetime(&raw).ok_or_else(|| format!("Invalid date: {raw}"))?,
            None => Utc::now(),
        };
        let status = match form.non_empty("status") {
            Some(raw) => EventStatus::parse(&raw).ok_or_else(|| format!("Unknown status: {raw}"))?,
            None => EventStatus::Upcoming,
        };
        Ok(EventDraft {
            title,
            description: form.non_empty("description").unwrap_or_default(),
            event_date,
            location: form.non_empty("location").unwrap_or_default(),
            meeting_link: form.non_empty("meeting_link"),
            poster_url: None,
            status,
            created_by: None,
        })
    }

    fn image_slot(draft: &mut EventDraft) -> Option<&mut Option<String>> {
        Some(&mut draft.poster_url)
    }

    fn stamp_creator(draft: &mut EventDraft, identity: &Identity) {
        draft.created_by = Some(identity.user_id);
    }

    fn choices() -> Value {
        json!({ "status": ["Upcoming", "Live", "Completed"] })
    }
}
