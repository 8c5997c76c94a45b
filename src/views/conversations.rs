use std::collections::HashMap;
use std::sync::Arc;

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use serde::Deserialize;

use crate::auth::policy::{Action, Actor};
use crate::db;
use crate::db::conversations::{ConversationFilter, FilterOptions, PAGE_SIZE};
use crate::error::AppError;
use crate::models::Conversation;
use crate::state::{AppState, SharedState};
use crate::stores::degrade;
use crate::views::{format_datetime, Nav, SelectOption};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub seller_id: Option<String>,
    pub sales_stage: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
}

impl ListQuery {
    fn filter(&self) -> ConversationFilter {
        ConversationFilter {
            seller_id: self.seller_id.clone(),
            sales_stage: self.sales_stage.clone(),
            tag: self.tag.clone(),
            search: self.search.clone(),
        }
    }

    /// Query string for `page`, keeping the active filters.
    pub fn page_href(&self, page: i64) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (key, value) in [
            ("seller_id", &self.seller_id),
            ("sales_stage", &self.sales_stage),
            ("tag", &self.tag),
            ("search", &self.search),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                query.append_pair(key, value);
            }
        }
        query.append_pair("page", &page.to_string());
        format!("/conversations?{}", query.finish())
    }
}

pub struct ConversationRow {
    pub id: String,
    pub chat_id: String,
    pub client_name: String,
    pub client_email: String,
    pub sales_stage: String,
    pub tags: Vec<String>,
    pub sellers: String,
    pub last_update: String,
}

pub struct PageLink {
    pub number: i64,
    pub href: String,
    pub current: bool,
}

#[derive(Template)]
#[template(path = "conversations/list.html")]
#[allow(dead_code)]
struct ListTemplate {
    nav: Nav,
    rows: Vec<ConversationRow>,
    total: i64,
    sellers: Vec<SelectOption>,
    tags: Vec<SelectOption>,
    sales_stages: Vec<SelectOption>,
    search: String,
    pages: Vec<PageLink>,
    previous: Option<String>,
    next: Option<String>,
}

/// External UUID -> e-mail, cached.
pub async fn email_map(state: &AppState) -> Result<Arc<HashMap<String, String>>, AppError> {
    state
        .caches
        .emails
        .get_or_try_insert_with((), || async {
            let pairs = db::profiles::external_uuid_emails(&state.stores.main).await?;
            Ok::<_, AppError>(Arc::new(pairs.into_iter().collect()))
        })
        .await
}

async fn filter_options(
    state: &AppState,
    organization: Option<&str>,
) -> Result<FilterOptions, AppError> {
    state
        .caches
        .filter_options
        .get_or_try_insert_with(organization.map(str::to_string), || async {
            let options =
                db::conversations::filter_options(&state.stores.main, organization).await?;
            Ok::<_, AppError>(options)
        })
        .await
}

fn seller_label(emails: &HashMap<String, String>, uuid: &str) -> String {
    emails
        .get(uuid)
        .filter(|e| !e.is_empty())
        .cloned()
        .unwrap_or_else(|| uuid.to_string())
}

fn row(conversation: &Conversation, emails: &HashMap<String, String>) -> ConversationRow {
    ConversationRow {
        id: conversation.id.to_string(),
        chat_id: conversation.chat_id.clone(),
        client_name: conversation.client_name().to_string(),
        client_email: conversation.client_email().to_string(),
        sales_stage: conversation.sales_stage().to_string(),
        tags: conversation.tags(),
        sellers: conversation
            .agents
            .iter()
            .map(|a| seller_label(emails, a))
            .collect::<Vec<_>>()
            .join(", "),
        last_update: format_datetime(&conversation.last_update),
    }
}

pub async fn list(
    actor: Actor,
    State(state): State<SharedState>,
    Query(q): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let scope = actor.tenant_scope();
    let page = q.page.unwrap_or(1).max(1);

    let (conversations, total, options) = match scope.organization_filter() {
        Some(organization) => {
            let (conversations, total) =
                db::conversations::list(&state.stores.main, organization, &q.filter(), page).await?;
            let options = filter_options(&state, organization).await?;
            (conversations, total, options)
        }
        None => (Vec::new(), 0, FilterOptions::default()),
    };
    let emails = email_map(&state).await?;

    let current = |value: &Option<String>| value.clone().unwrap_or_default();
    let seller_id = current(&q.seller_id);
    let tag = current(&q.tag);
    let stage = current(&q.sales_stage);

    let page_count = (total + PAGE_SIZE - 1) / PAGE_SIZE;
    let pages = (1..=page_count)
        .map(|number| PageLink {
            number,
            href: q.page_href(number),
            current: number == page,
        })
        .collect();

    let template = ListTemplate {
        nav: Nav::new(&actor, "conversations"),
        rows: conversations.iter().map(|c| row(c, &emails)).collect(),
        total,
        sellers: options
            .sellers
            .iter()
            .map(|s| SelectOption::new(s.as_str(), seller_label(&emails, s), &seller_id))
            .collect(),
        tags: options
            .tags
            .iter()
            .map(|t| SelectOption::new(t.as_str(), t.as_str(), &tag))
            .collect(),
        sales_stages: options
            .sales_stages
            .iter()
            .map(|s| SelectOption::new(s.as_str(), s.as_str(), &stage))
            .collect(),
        search: current(&q.search),
        pages,
        previous: (page > 1).then(|| q.page_href(page - 1)),
        next: (page < page_count).then(|| q.page_href(page + 1)),
    };
    Ok(Html(template.render().unwrap_or_default()))
}

pub struct MessageRow {
    pub sender: String,
    pub content: String,
    pub channel: String,
    pub sent_at: String,
}

pub struct EventRow {
    pub event_type: String,
    pub event_subtype: String,
    pub origin: String,
    pub datetime: String,
}

#[derive(Template)]
#[template(path = "conversations/detail.html")]
#[allow(dead_code)]
struct DetailTemplate {
    nav: Nav,
    conversation: ConversationRow,
    messages: Vec<MessageRow>,
    events: Vec<EventRow>,
}

pub async fn detail(
    actor: Actor,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let conversation = db::conversations::find(&state.stores.main, &id)
        .await?
        .filter(|c| {
            actor.can(Action::ViewTenant {
                organization: c.alma_internal_organization.as_deref(),
            })
        })
        .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

    let emails = email_map(&state).await?;
    let messages = db::conversations::messages(&state.stores.main, conversation.id).await?;

    let events = match &state.stores.events {
        Some(pool) => degrade(
            "events",
            db::events::for_conversation(pool, &conversation.chat_id).await,
        ),
        None => Vec::new(),
    };

    let template = DetailTemplate {
        nav: Nav::new(&actor, "conversations"),
        conversation: row(&conversation, &emails),
        messages: messages
            .iter()
            .map(|m| MessageRow {
                sender: m
                    .sender_uuid
                    .as_deref()
                    .map(|s| seller_label(&emails, s))
                    .unwrap_or_else(|| conversation.client_name().to_string()),
                content: m.content.clone(),
                channel: m.channel.clone().unwrap_or_default(),
                sent_at: format_datetime(&m.sent_at),
            })
            .collect(),
        events: events
            .iter()
            .map(|e| EventRow {
                event_type: e.event_type.clone(),
                event_subtype: e.event_subtype.clone().unwrap_or_default(),
                origin: e.origin().to_string(),
                datetime: format_datetime(&e.datetime),
            })
            .collect(),
    };
    Ok(Html(template.render().unwrap_or_default()))
}
