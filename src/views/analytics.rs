use askama::Template;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use serde_json::Value;
use uuid::Uuid;

use crate::analytics::gold::{self, Dataset};
use crate::analytics::objections::ObjectionSummary;
use crate::analytics::scores::{AgentScores, TeamSummary};
use crate::analytics::service;
use crate::auth::policy::{self, Action, Actor, Subject};
use crate::db;
use crate::error::AppError;
use crate::state::SharedState;
use crate::views::Nav;

/// Rows shown on a gold dataset page.
pub const GOLD_PAGE_ROWS: usize = 100;

pub struct DatasetLink {
    pub href: String,
    pub title: String,
}

fn dataset_links() -> Vec<DatasetLink> {
    Dataset::ALL
        .iter()
        .map(|d| DatasetLink {
            href: format!("/analytics/gold/{}", d.slug()),
            title: d.title().to_string(),
        })
        .collect()
}

#[derive(Template)]
#[template(path = "analytics/index.html")]
#[allow(dead_code)]
struct IndexTemplate {
    nav: Nav,
    agents: Vec<AgentScores>,
    summary: TeamSummary,
    objections: Vec<ObjectionSummary>,
    datasets: Vec<DatasetLink>,
}

pub async fn index(
    actor: Actor,
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let members =
        db::profiles::list_visible(&state.stores.main, &policy::visible_members(&actor)).await?;
    let overview = service::team_overview(&state.stores, &members).await;

    let template = IndexTemplate {
        nav: Nav::new(&actor, "analytics"),
        agents: overview.agents,
        summary: overview.summary,
        objections: overview.objections,
        datasets: dataset_links(),
    };
    Ok(Html(template.render().unwrap_or_default()))
}

#[derive(Template)]
#[template(path = "analytics/agent.html")]
#[allow(dead_code)]
struct AgentTemplate {
    nav: Nav,
    display_name: String,
    profile_id: String,
    scores: Option<AgentScores>,
    chart_json: String,
}

/// JSON for an inline `<script>` block.
fn script_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

pub async fn agent(
    actor: Actor,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let member = db::profiles::find_member(&state.stores.main, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))?;
    actor.require(Action::ViewAgent(Subject::from(&member)))?;

    let detail = service::agent_detail(&state.stores, &member).await;

    let template = AgentTemplate {
        nav: Nav::new(&actor, "analytics"),
        display_name: member.display_name(),
        profile_id: member.id.to_string(),
        chart_json: script_json(&detail.stages),
        scores: detail.scores,
    };
    Ok(Html(template.render().unwrap_or_default()))
}

#[derive(Template)]
#[template(path = "analytics/gold.html")]
#[allow(dead_code)]
struct GoldTemplate {
    nav: Nav,
    title: String,
    available: bool,
    summary: gold::Summary,
    shown: usize,
    rows: Vec<Vec<String>>,
    datasets: Vec<DatasetLink>,
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Table cells in column order; missing keys render empty.
pub fn table(rows: &[gold::Row], columns: &[String]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| columns.iter().map(|c| cell(row.get(c))).collect())
        .collect()
}

pub async fn gold(
    actor: Actor,
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let dataset: Dataset = slug
        .parse()
        .map_err(|_| AppError::NotFound(format!("Unknown dataset: {slug}")))?;

    let rows = gold::load(&state.config.gold_data_dir, dataset).await;
    let (summary, table_rows) = match &rows {
        Some(rows) => {
            let summary = gold::summary(rows);
            let shown = gold::slice(rows, Some(GOLD_PAGE_ROWS));
            let table_rows = table(shown, &summary.columns);
            (summary, table_rows)
        }
        None => (gold::Summary::default(), Vec::new()),
    };

    let template = GoldTemplate {
        nav: Nav::new(&actor, "analytics"),
        title: dataset.title().to_string(),
        available: rows.is_some(),
        shown: table_rows.len(),
        summary,
        rows: table_rows,
        datasets: dataset_links(),
    };
    Ok(Html(template.render().unwrap_or_default()))
}
