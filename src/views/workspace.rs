use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse};

use crate::auth::chatbase;
use crate::auth::policy::Actor;
use crate::error::AppError;
use crate::state::SharedState;
use crate::views::Nav;

#[derive(Template)]
#[template(path = "workspace.html")]
#[allow(dead_code)]
struct WorkspaceTemplate {
    nav: Nav,
    display_name: String,
    widget_token: Option<String>,
}

pub async fn index(
    actor: Actor,
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let widget_token = chatbase::widget_token(&actor, state.config.chatbase_secret.as_deref());

    let template = WorkspaceTemplate {
        nav: Nav::new(&actor, "workspace"),
        display_name: actor.display_name.clone(),
        widget_token,
    };
    Ok(Html(template.render().unwrap_or_default()))
}
