use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{Card, Collection, Resource};
use crate::backend::models::{TeamCategory, TeamMember};
use crate::backend::{OrderBy, Table};
use crate::forms::FormData;
use crate::image_upload::ImageField;

pub struct Team;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamDraft {
    pub name: String,
    pub position: String,
    pub category: TeamCategory,
    pub image_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub order_index: i32,
}

impl Collection for Team {
    type Row = TeamMember;

    const TABLE: Table = Table::TeamMembers;
    const ORDER: OrderBy = OrderBy::asc("order_index");
    const NOUN: &'static str = "Team member";
    const LABEL: &'static str = "team members";
    const DELETED: &'static str = "Team member removed";
    const DELETE_FAILED: &'static str = "Failed to delete team member";
    const CONFIRM_PROMPT: &'static str = "Are you sure you want to remove this team member?";

    fn id(row: &TeamMember) -> Uuid {
        row.id
    }

    fn card(row: &TeamMember) -> Card {
        Card {
            id: row.id,
            title: row.name.clone(),
            subtitle: Some(row.position.clone()).filter(|p| !p.is_empty()),
            tag: Some(row.category.as_str().to_string()),
            image_url: row.image_url.clone(),
        }
    }
}

impl Resource for Team {
    type Draft = TeamDraft;

    const CREATED: &'static str = "Team member added successfully";
    const UPDATED: &'static str = "Team member updated successfully";
    const SAVE_FAILED: &'static str = "Failed to save team member";
    const IMAGE_FIELD: Option<ImageField<'static>> = Some(ImageField {
        name: "image_url",
        folder: "bandipur/team",
    });

    /// New members go to the end of the list.
    fn default_draft(existing: u64) -> TeamDraft {
        TeamDraft {
            name: String::new(),
            position: String::new(),
            category: TeamCategory::WebOps,
            image_url: None,
            linkedin_url: None,
            email: None,
            bio: None,
            order_index: i32::try_from(existing).unwrap_or(i32::MAX),
        }
    }

    fn to_draft(row: &TeamMember) -> TeamDraft {
        TeamDraft {
            name: row.name.clone(),
            position: row.position.clone(),
            category: row.category,
            image_url: row.image_url.clone(),
            linkedin_url: row.linkedin_url.clone(),
            email: row.email.clone(),
            bio: row.bio.clone(),
            order_index: row.order_index,
        }
    }

    fn draft_from_form(form: &FormData) -> Result<TeamDraft, String> {
        let name = form.required("name", "Name")?;
        let position = form.required("position", "Position")?;
        let category = match form.non_empty("category") {
            Some(raw) => {
                TeamCategory::parse(&raw).ok_or_else(|| format!("Unknown category: {raw}"))?
            }
            None => TeamCategory::WebOps,
        };
        let order_index = match form.non_empty("order_index") {
            Some(raw) => raw
                .parse::<i32>()
                .map_err(|_| "Display order must be a whole number".to_string())?,
            None => 0,
        };
        Ok(TeamDraft {
            name,
            position,
            category,
            image_url: None,
            linkedin_url: form.non_empty("linkedin_url"),
            email: form.non_empty("email"),
            bio: form.non_empty("bio"),
            order_index,
        })
    }

    fn image_slot(draft: &mut TeamDraft) -> Option<&mut Option<String>> {
        Some(&mut draft.image_url)
    }

    fn choices() -> Value {
        let categories: Vec<Value> = TeamCategory::ALL
            .iter()
            .map(|c| json!({ "value": c.as_str(), "label": c.label() }))
            .collect();
        json!({ "category": categories })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_draft_appends_after_existing_members() {
        let draft = Team::default_draft(4);
        assert_eq!(draft.order_index, 4);
        assert_eq!(draft.category, TeamCategory::WebOps);
    }

    #[test]
    fn test_position_is_required() {
        let form = FormData::default().with_text("name", "Asha");
        assert_eq!(Team::draft_from_form(&form).unwrap_err(), "Position is required");
    }

    #[test]
    fn test_order_index_must_be_numeric() {
        let form = FormData::default()
            .with_text("name", "Asha")
            .with_text("position", "Secretary")
            .with_text("order_index", "first");
        assert!(Team::draft_from_form(&form).is_err());

        let form = form.with_text("order_index", "3").with_text("category", "Core");
        let draft = Team::draft_from_form(&form).unwrap();
        assert_eq!(draft.order_index, 3);
        assert_eq!(draft.category, TeamCategory::Core);
    }
}
