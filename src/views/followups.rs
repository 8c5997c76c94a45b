use askama::Template;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::policy::{self, Action, Actor, Subject};
use crate::db;
use crate::error::AppError;
use crate::followups::priority::{self, PrioritizedTask};
use crate::models::Member;
use crate::state::{AppState, SharedState};
use crate::stores::degrade;
use crate::views::{format_datetime, Nav, SelectOption};

#[derive(Debug, Default, Deserialize)]
pub struct FollowupsQuery {
    #[serde(default)]
    pub agent: Option<Uuid>,
}

pub struct TaskRow {
    pub conversation_uuid: String,
    pub score: i32,
    pub due: String,
    pub overdue: bool,
    pub link: String,
}

impl TaskRow {
    fn new(entry: PrioritizedTask, now: chrono::DateTime<Utc>) -> Self {
        Self {
            conversation_uuid: entry.task.conversation_uuid.unwrap_or_default(),
            score: entry.task.score,
            due: format_datetime(&entry.task.follow_up_date),
            overdue: entry.task.follow_up_date <= now,
            link: entry.link,
        }
    }
}

#[derive(Template)]
#[template(path = "followups/index.html")]
#[allow(dead_code)]
struct IndexTemplate {
    nav: Nav,
    agent_name: String,
    agent_id: String,
    agents: Vec<SelectOption>,
    has_agent_uuid: bool,
    high: Vec<TaskRow>,
    low: Vec<TaskRow>,
    limit: usize,
}

/// The agent whose follow-ups are shown: `requested` when the actor may view
/// them, the actor's own profile otherwise.
pub async fn target_agent(
    state: &AppState,
    actor: &Actor,
    requested: Option<Uuid>,
) -> Result<Member, AppError> {
    let id = requested.unwrap_or(actor.profile_id);
    let member = db::profiles::find_member(&state.stores.main, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))?;
    actor.require(Action::ViewAgent(Subject::from(&member)))?;
    Ok(member)
}

pub async fn index(
    actor: Actor,
    State(state): State<SharedState>,
    Query(query): Query<FollowupsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let member = target_agent(&state, &actor, query.agent).await?;
    let now = Utc::now();
    let limit = state.config.followup_high_priority_limit;

    let buckets = match (member.agent_uuid(), &state.stores.followups) {
        (Some(agent_uuid), Some(pool)) => {
            let tasks = degrade(
                "followups",
                db::followups::tasks_for_agent(pool, agent_uuid).await,
            );
            let links = degrade(
                "followups",
                db::followups::links_for_seller(pool, agent_uuid).await,
            );
            let index = priority::link_index(&links, &state.config.short_link_base_url);
            priority::prioritize(tasks, &index, limit, now, &state.config.infobip_conversation_url)
        }
        _ => priority::Buckets::default(),
    };

    let selected = member.id.to_string();
    let agents = db::profiles::list_visible(&state.stores.main, &policy::visible_members(&actor))
        .await?
        .iter()
        .filter(|m| m.agent_uuid().is_some() || m.id == member.id)
        .map(|m| SelectOption::new(m.id.to_string(), m.display_name(), &selected))
        .collect();

    let template = IndexTemplate {
        nav: Nav::new(&actor, "followups"),
        agent_name: member.display_name(),
        agent_id: selected,
        agents,
        has_agent_uuid: member.agent_uuid().is_some(),
        high: buckets.high.into_iter().map(|t| TaskRow::new(t, now)).collect(),
        low: buckets.low.into_iter().map(|t| TaskRow::new(t, now)).collect(),
        limit,
    };
    Ok(Html(template.render().unwrap_or_default()))
}
