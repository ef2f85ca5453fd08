/**
 * Dashboard Routes
 * Landing view of the admin area: the signed-in profile, the navigation
 * allowed for its role and per-table row counts.
 */
use axum::{extract::Query, extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::backend::Table;
use crate::gate::{AdminSession, SUPERADMIN_REQUIRED, SUPERADMIN_REQUIRED_MESSAGE};
use crate::session::Identity;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub notice: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct NavLink {
    pub label: String,
    pub href: String,
}

/// Row counts; `None` when the count could not be read
#[derive(Debug, Serialize, Default)]
pub struct Counts {
    pub events: Option<u64>,
    pub clubs: Option<u64>,
    pub team_members: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admins: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub profile: Identity,
    pub greeting: String,
    pub nav: Vec<NavLink>,
    pub counts: Counts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

pub fn nav_for(identity: &Identity) -> Vec<NavLink> {
    let mut links = vec![
        ("Overview", "/admin/dashboard"),
        ("Manage Events", "/admin/dashboard/events"),
        ("Manage Clubs", "/admin/dashboard/clubs"),
        ("Manage Team", "/admin/dashboard/team"),
    ];
    if identity.is_superadmin() {
        links.push(("Manage Admins", "/admin/dashboard/admins"));
    }
    links
        .into_iter()
        .map(|(label, href)| NavLink {
            label: label.to_string(),
            href: href.to_string(),
        })
        .collect()
}

async fn count(state: &AppState, identity: &Identity, table: Table) -> Option<u64> {
    match state.tables.count(table, Some(&identity.access_token)).await {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!(%table, error = %e, "count query failed");
            None
        }
    }
}

/// GET /admin/dashboard
pub async fn overview(
    State(state): State<AppState>,
    AdminSession(identity): AdminSession,
    Query(query): Query<DashboardQuery>,
) -> impl IntoResponse {
    let notice = query
        .notice
        .filter(|n| n == SUPERADMIN_REQUIRED)
        .map(|_| SUPERADMIN_REQUIRED_MESSAGE.to_string());

    let (events, clubs, team_members) = tokio::join!(
        count(&state, &identity, Table::Events),
        count(&state, &identity, Table::Clubs),
        count(&state, &identity, Table::TeamMembers),
    );
    let admins = if identity.is_superadmin() {
        count(&state, &identity, Table::Profiles).await
    } else {
        None
    };

    let response = DashboardResponse {
        greeting: format!("Welcome back, {}", identity.display_name()),
        nav: nav_for(&identity),
        counts: Counts {
            events,
            clubs,
            team_members,
            admins,
        },
        profile: identity,
        notice,
    };
    (StatusCode::OK, Json(response))
}
