/**
 * Public Routes
 * Read-only page payloads for the public site. Every read runs with the
 * anonymous key, and a failed query renders as an empty section.
 */
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::backend::models::{parse_rows, Club, ClubType, Event, EventStatus, TeamCategory, TeamMember};
use crate::backend::{OrderBy, Select, Table};
use crate::error::ErrorResponse;
use crate::state::AppState;

const HOME_EVENT_LIMIT: usize = 5;
const PLACEHOLDER_POSTER: &str =
    "https://images.unsplash.com/photo-1540575467063-178a50c2df87?auto=format&fit=crop&w=800&q=80";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavLink {
    pub label: String,
    pub href: String,
}

fn link(label: &str, href: &str) -> NavLink {
    NavLink {
        label: label.to_string(),
        href: href.to_string(),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkGroup {
    pub title: String,
    pub links: Vec<NavLink>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SiteResponse {
    pub name: String,
    pub nav: Vec<NavLink>,
    pub footer: Vec<LinkGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeEvent {
    pub title: String,
    pub status: String,
    #[serde(default)]
    pub poster_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HomeResponse {
    pub upcoming: Vec<HomeEvent>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub tab: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EventsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upcoming: Option<Vec<Event>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub past: Option<Vec<Event>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competitions: Option<Vec<Event>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClubGroup {
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    pub clubs: Vec<Club>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TeamGroup {
    pub category: String,
    pub label: String,
    pub members: Vec<TeamMember>,
}

#[derive(Debug, Serialize)]
pub struct ResourceSection {
    pub title: &'static str,
    pub kind: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OfficeHours {
    pub days: &'static str,
    pub hours: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub organisation: &'static str,
    pub address: [&'static str; 4],
    pub emails: [&'static str; 2],
    pub phone: &'static str,
    pub office_hours: [OfficeHours; 3],
}

// ============================================================================
// Grouping
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTab {
    Upcoming,
    Past,
    Competitions,
}

impl EventTab {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "upcoming" => Some(EventTab::Upcoming),
            "past" => Some(EventTab::Past),
            "competitions" => Some(EventTab::Competitions),
            _ => None,
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        match self {
            EventTab::Upcoming => matches!(event.status, EventStatus::Upcoming | EventStatus::Live),
            EventTab::Past => event.status == EventStatus::Completed,
            EventTab::Competitions => {
                event.title.to_lowercase().contains("competition")
                    || event.description.to_lowercase().contains("competition")
            }
        }
    }

    pub fn select(&self, events: &[Event]) -> Vec<Event> {
        events.iter().filter(|e| self.matches(e)).cloned().collect()
    }
}

pub fn group_clubs(clubs: Vec<Club>) -> Vec<ClubGroup> {
    ClubType::ALL
        .iter()
        .filter_map(|kind| {
            let members: Vec<Club> = clubs.iter().filter(|c| c.kind == *kind).cloned().collect();
            (!members.is_empty()).then(|| ClubGroup {
                kind: kind.as_str().to_string(),
                label: kind.label().to_string(),
                clubs: members,
            })
        })
        .collect()
}

pub fn group_team(mut members: Vec<TeamMember>) -> Vec<TeamGroup> {
    members.sort_by_key(|m| m.order_index);
    TeamCategory::ALL
        .iter()
        .filter_map(|category| {
            let group: Vec<TeamMember> = members
                .iter()
                .filter(|m| m.category == *category)
                .cloned()
                .collect();
            (!group.is_empty()).then(|| TeamGroup {
                category: category.as_str().to_string(),
                label: category.label().to_string(),
                members: group,
            })
        })
        .collect()
}

async fn read<T: serde::de::DeserializeOwned>(
    state: &AppState,
    table: Table,
    query: Select,
) -> Vec<T> {
    match state.tables.select(table, &query, None).await {
        Ok(rows) => parse_rows(table, rows),
        Err(e) => {
            tracing::warn!(table = %table, error = %e, "public read failed");
            Vec::new()
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/site
pub async fn site() -> impl IntoResponse {
    Json(SiteResponse {
        name: "Bandipur House".to_string(),
        nav: vec![
            link("Home", "/"),
            link("Events", "/events"),
            link("Resources", "/resources"),
            link("Clubs", "/clubs"),
            link("Team", "/team"),
            link("Contact", "/contact"),
        ],
        footer: vec![
            LinkGroup {
                title: "Explore".to_string(),
                links: vec![
                    link("Events Hub", "/events"),
                    link("Resources", "/resources"),
                    link("Clubs", "/clubs"),
                    link("Team", "/team"),
                ],
            },
            LinkGroup {
                title: "Initiatives".to_string(),
                links: vec![
                    link("House Cup", "/events?tab=competitions"),
                    link("Mentorship", "/resources"),
                    link("Startups", "/clubs"),
                ],
            },
            LinkGroup {
                title: "General".to_string(),
                links: vec![link("Admin Portal", "/admin/login"), link("Contact Us", "/contact")],
            },
            LinkGroup {
                title: "Connect".to_string(),
                links: vec![
                    link("LinkedIn", "https://linkedin.com"),
                    link("Instagram", "https://instagram.com"),
                    link("GitHub", "https://github.com"),
                ],
            },
        ],
    })
}

/// GET /api/home
pub async fn home(State(state): State<AppState>) -> impl IntoResponse {
    let query = Select::all()
        .columns("title, status, poster_url")
        .eq("status", EventStatus::Upcoming.as_str())
        .order(OrderBy::asc("event_date"))
        .limit(HOME_EVENT_LIMIT);
    let mut upcoming: Vec<HomeEvent> = read(&state, Table::Events, query).await;

    if upcoming.is_empty() {
        upcoming.push(HomeEvent {
            title: "No Upcoming Events".to_string(),
            status: "Stay Tuned".to_string(),
            poster_url: Some(PLACEHOLDER_POSTER.to_string()),
        });
    }
    Json(HomeResponse { upcoming })
}

/// GET /api/events?tab=upcoming|past|competitions
pub async fn events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let tab = match query.tab.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(raw) => match EventTab::parse(raw) {
            Some(tab) => Some(tab),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: "Unknown tab".to_string(),
                        message: Some("Use upcoming, past or competitions".to_string()),
                    }),
                )
                    .into_response();
            }
        },
        None => None,
    };

    let all: Vec<Event> = read(
        &state,
        Table::Events,
        Select::all().order(OrderBy::asc("event_date")),
    )
    .await;

    let wanted = |t: EventTab| tab.is_none() || tab == Some(t);
    let response = EventsResponse {
        upcoming: wanted(EventTab::Upcoming).then(|| EventTab::Upcoming.select(&all)),
        past: wanted(EventTab::Past).then(|| EventTab::Past.select(&all)),
        competitions: wanted(EventTab::Competitions).then(|| EventTab::Competitions.select(&all)),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// GET /api/clubs
pub async fn clubs(State(state): State<AppState>) -> impl IntoResponse {
    let clubs: Vec<Club> = read(&state, Table::Clubs, Select::all().order(OrderBy::asc("name"))).await;
    Json(group_clubs(clubs))
}

/// GET /api/team
pub async fn team(State(state): State<AppState>) -> impl IntoResponse {
    let members: Vec<TeamMember> = read(
        &state,
        Table::TeamMembers,
        Select::all().order(OrderBy::asc("order_index")),
    )
    .await;
    Json(group_team(members))
}

/// GET /api/resources
pub async fn resources() -> impl IntoResponse {
    Json(vec![
        ResourceSection {
            title: "Lecture Notes",
            kind: "Notes",
            description: "Comprehensive notes for all terms, curated by the best minds.",
        },
        ResourceSection {
            title: "PYQs",
            kind: "Previous Year Papers",
            description: "Organized by Term and Subject to help you ace your exams.",
        },
        ResourceSection {
            title: "Senior Wisdom",
            kind: "Guides",
            description: "\"How to balance a job and the BS degree\" and other survival guides.",
        },
    ])
}

/// GET /api/contact
pub async fn contact() -> impl IntoResponse {
    Json(ContactResponse {
        organisation: "Bandipur House",
        address: ["IIT Madras", "Chennai", "Tamil Nadu 600036", "India"],
        emails: ["secretary@bandipur.com", "webops@bandipur.com"],
        phone: "+91 98765 43210",
        office_hours: [
            OfficeHours {
                days: "Monday - Friday",
                hours: "9:00 AM - 5:00 PM",
            },
            OfficeHours {
                days: "Saturday",
                hours: "10:00 AM - 2:00 PM",
            },
            OfficeHours {
                days: "Sunday",
                hours: "Closed",
            },
        ],
    })
}
