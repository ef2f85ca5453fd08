use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{Card, Collection, Resource};
use crate::backend::models::{Club, ClubType};
use crate::backend::{OrderBy, Table};
use crate::forms::FormData;
use crate::image_upload::ImageField;

pub struct Clubs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClubDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ClubType,
    pub description: String,
    pub image_url: Option<String>,
    pub secretary_name: Option<String>,
    pub secretary_contact: Option<String>,
}

impl Collection for Clubs {
    type Row = Club;

    const TABLE: Table = Table::Clubs;
    const ORDER: OrderBy = OrderBy::asc("name");
    const NOUN: &'static str = "Club";
    const LABEL: &'static str = "clubs";
    const DELETED: &'static str = "Deleted successfully";
    const DELETE_FAILED: &'static str = "Failed to delete";
    const CONFIRM_PROMPT: &'static str = "Are you sure you want to delete this entity?";

    fn id(row: &Club) -> Uuid {
        row.id
    }

    fn card(row: &Club) -> Card {
        Card {
            id: row.id,
            title: row.name.clone(),
            subtitle: row.secretary_name.clone(),
            tag: Some(row.kind.as_str().to_string()),
            image_url: row.image_url.clone(),
        }
    }
}

impl Resource for Clubs {
    type Draft = ClubDraft;

    const CREATED: &'static str = "Club created successfully";
    const UPDATED: &'static str = "Club updated successfully";
    const SAVE_FAILED: &'static str = "Failed to save club";
    const IMAGE_FIELD: Option<ImageField<'static>> = Some(ImageField {
        name: "image_url",
        folder: "bandipur/clubs",
    });

    fn default_draft(_existing: u64) -> ClubDraft {
        ClubDraft {
            name: String::new(),
            kind: ClubType::Club,
            description: String::new(),
            image_url: None,
            secretary_name: None,
            secretary_contact: None,
        }
    }

    fn to_draft(row: &Club) -> ClubDraft {
        ClubDraft {
            name: row.name.clone(),
            kind: row.kind,
            description: row.description.clone(),
            image_url: row.image_url.clone(),
            secretary_name: row.secretary_name.clone(),
            secretary_contact: row.secretary_contact.clone(),
        }
    }

    fn draft_from_form(form: &FormData) -> Result<ClubDraft, String> {
        let name = form.required("name", "Name")?;
        let kind = match form.non_empty("type") {
            Some(raw) => ClubType::parse(&raw).ok_or_else(|| format!("Unknown type: {raw}"))?,
            None => ClubType::Club,
        };
        Ok(ClubDraft {
            name,
            kind,
            description: form.non_empty("description").unwrap_or_default(),
            image_url: None,
            secretary_name: form.non_empty("secretary_name"),
            secretary_contact: form.non_empty("secretary_contact"),
        })
    }

    fn image_slot(draft: &mut ClubDraft) -> Option<&mut Option<String>> {
        Some(&mut draft.image_url)
    }

    fn choices() -> Value {
        let types: Vec<Value> = ClubType::ALL
            .iter()
            .map(|t| json!({ "value": t.as_str(), "label": t.label() }))
            .collect();
        json!({ "type": types })
    }
}
