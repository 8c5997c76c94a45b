mod common;

use alma_crm::models::Role;
use reqwest::StatusCode;

// ── Health & sessions ───────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    common::cleanup(app).await;
}

#[tokio::test]
async fn pages_redirect_to_login_without_session() {
    let app = common::spawn_app().await;

    let page = app.get("/teams", None).await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location.as_deref(), Some("/auth/login?next=%2Fteams"));

    let page = app.get("/auth/login", None).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("name=\"password\""));

    common::cleanup(app).await;
}

#[tokio::test]
async fn admin_logs_in_with_configured_password() {
    let app = common::spawn_app().await;

    let token = app.login_admin().await;
    let page = app.get("/admin-panel", Some(&token)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Admin panel"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn wrong_password_rerenders_login() {
    let app = common::spawn_app().await;
    app.create_member("ana", Role::User, None, None).await;

    assert!(app.login("ana", "not-the-password").await.is_none());
    assert!(app.login("admin", "not-the-password").await.is_none());

    let resp = app
        .client
        .post(app.url("/auth/login"))
        .form(&[("username", "ana"), ("password", "nope")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("Invalid username or password"));

    assert!(app.login("ana", common::PASSWORD).await.is_some());

    common::cleanup(app).await;
}

#[tokio::test]
async fn repeated_failures_lock_the_username() {
    let app = common::spawn_app().await;
    app.create_member("bruno", Role::User, None, None).await;

    for _ in 0..5 {
        assert!(app.login("bruno", "wrong").await.is_none());
    }
    assert!(app.login("bruno", common::PASSWORD).await.is_none());

    common::cleanup(app).await;
}

// ── Authorization ───────────────────────────────────────────────

#[tokio::test]
async fn plain_user_cannot_open_admin_pages() {
    let app = common::spawn_app().await;
    let org = app.create_organization("Acme").await;
    app.create_member("carla", Role::User, None, Some(&org)).await;
    let token = app.login("carla", common::PASSWORD).await.unwrap();

    assert_eq!(app.get("/admin-panel", Some(&token)).await.status, StatusCode::FORBIDDEN);
    assert_eq!(
        app.get("/admin-panel/authorizations", Some(&token)).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(app.get("/teams/new", Some(&token)).await.status, StatusCode::FORBIDDEN);

    common::cleanup(app).await;
}

#[tokio::test]
async fn director_cannot_grant_admin() {
    let app = common::spawn_app().await;
    let org = app.create_organization("Acme").await;
    app.create_member("diretora", Role::Director, None, Some(&org)).await;
    let user = app.create_member("davi", Role::User, None, Some(&org)).await;
    let token = app.login("diretora", common::PASSWORD).await.unwrap();

    let page = app
        .post_form(
            &format!("/agentes/{user}/edit"),
            &token,
            &[("email", "davi@example.com"), ("role", "Admin"), ("team_id", "")],
        )
        .await;
    assert_eq!(page.status, StatusCode::FORBIDDEN);
    assert_eq!(app.profile_assignment(user).await.1, "User");

    let page = app
        .post_form(
            &format!("/agentes/{user}/edit"),
            &token,
            &[("email", "davi@example.com"), ("role", "Manager"), ("team_id", "")],
        )
        .await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(app.profile_assignment(user).await.1, "Manager");

    common::cleanup(app).await;
}

#[tokio::test]
async fn director_cannot_edit_other_organizations() {
    let app = common::spawn_app().await;
    let acme = app.create_organization("Acme").await;
    let globex = app.create_organization("Globex").await;
    app.create_member("diretora", Role::Director, None, Some(&acme)).await;
    let outsider = app.create_member("otto", Role::User, None, Some(&globex)).await;
    let token = app.login("diretora", common::PASSWORD).await.unwrap();

    let page = app.get(&format!("/agentes/{outsider}/edit"), Some(&token)).await;
    assert_eq!(page.status, StatusCode::FORBIDDEN);

    let list = app.get("/agentes", Some(&token)).await;
    assert!(list.body.contains("diretora"));
    assert!(!list.body.contains("otto"));

    common::cleanup(app).await;
}

// ── Team leadership ─────────────────────────────────────────────

#[tokio::test]
async fn user_cannot_join_a_team_without_leader() {
    let app = common::spawn_app().await;
    let org = app.create_organization("Acme").await;
    let team = app.create_team("Vendas", Some(&org)).await;
    let token = app.login_admin().await;
    let team_id = team.to_string();

    let page = app
        .post_form(
            "/agentes/new",
            &token,
            &[
                ("username", "novato"),
                ("password", "long-enough"),
                ("email", "novato@example.com"),
                ("role", "User"),
                ("team_id", &team_id),
                ("organization", &org),
            ],
        )
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("leader"));

    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE username = 'novato')")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert!(!exists.0, "failed create must roll back the user");

    common::cleanup(app).await;
}

#[tokio::test]
async fn last_leader_cannot_leave_a_team_with_members() {
    let app = common::spawn_app().await;
    let org = app.create_organization("Acme").await;
    let team = app.create_team("Vendas", Some(&org)).await;
    let manager = app.create_member("gerente", Role::Manager, Some(team), Some(&org)).await;
    app.create_member("vendedor", Role::User, Some(team), Some(&org)).await;
    let token = app.login_admin().await;

    let page = app
        .post_form(
            &format!("/agentes/{manager}/edit"),
            &token,
            &[
                ("email", "gerente@example.com"),
                ("role", "Manager"),
                ("team_id", ""),
                ("organization", &org),
            ],
        )
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("current team"));
    assert_eq!(
        app.profile_assignment(manager).await,
        (Some(team), "Manager".to_string())
    );

    let page = app
        .post_form(
            &format!("/agentes/{manager}/edit"),
            &token,
            &[
                ("email", "gerente@example.com"),
                ("role", "User"),
                ("team_id", &team.to_string()),
                ("organization", &org),
            ],
        )
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(app.profile_assignment(manager).await.1, "Manager");

    common::cleanup(app).await;
}

#[tokio::test]
async fn user_joins_a_led_team() {
    let app = common::spawn_app().await;
    let org = app.create_organization("Acme").await;
    let team = app.create_team("Vendas", Some(&org)).await;
    app.create_member("gerente", Role::Manager, Some(team), Some(&org)).await;
    let user = app.create_member("vendedor", Role::User, None, Some(&org)).await;
    let token = app.login_admin().await;

    let page = app
        .post_form(
            &format!("/agentes/{user}/edit"),
            &token,
            &[
                ("email", "vendedor@example.com"),
                ("role", "User"),
                ("team_id", &team.to_string()),
                ("organization", &org),
            ],
        )
        .await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(app.profile_assignment(user).await, (Some(team), "User".to_string()));

    common::cleanup(app).await;
}

#[tokio::test]
async fn manager_edits_only_own_team_members() {
    let app = common::spawn_app().await;
    let org = app.create_organization("Acme").await;
    let vendas = app.create_team("Vendas", Some(&org)).await;
    let suporte = app.create_team("Suporte", Some(&org)).await;
    app.create_member("gerente", Role::Manager, Some(vendas), Some(&org)).await;
    let colega = app.create_member("colega", Role::User, Some(vendas), Some(&org)).await;
    app.create_member("lider", Role::Manager, Some(suporte), Some(&org)).await;
    let outro = app.create_member("outro", Role::User, Some(suporte), Some(&org)).await;
    let diretora = app.create_member("diretora", Role::Director, None, Some(&org)).await;
    let token = app.login("gerente", common::PASSWORD).await.unwrap();

    let page = app
        .post_form(
            &format!("/agentes/{colega}/edit"),
            &token,
            &[
                ("email", "colega@example.com"),
                ("first_name", "Carla"),
                ("role", "Manager"),
                ("team_id", &suporte.to_string()),
            ],
        )
        .await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(
        app.profile_assignment(colega).await,
        (Some(vendas), "User".to_string())
    );
    let (first_name,): (String,) = sqlx::query_as(
        "SELECT u.first_name FROM users u JOIN user_profiles p ON p.user_id = u.id
         WHERE p.id = $1",
    )
    .bind(colega)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(first_name, "Carla");

    for target in [outro, diretora] {
        let page = app.get(&format!("/agentes/{target}/edit"), Some(&token)).await;
        assert_eq!(page.status, StatusCode::FORBIDDEN);
        let page = app
            .post_form(
                &format!("/agentes/{target}/edit"),
                &token,
                &[("email", "x@example.com"), ("role", "User"), ("team_id", "")],
            )
            .await;
        assert_eq!(page.status, StatusCode::FORBIDDEN);
    }
    assert_eq!(
        app.profile_assignment(outro).await,
        (Some(suporte), "User".to_string())
    );

    common::cleanup(app).await;
}

#[tokio::test]
async fn moving_member_to_another_organization_requires_matching_team() {
    let app = common::spawn_app().await;
    let acme = app.create_organization("Acme").await;
    let globex = app.create_organization("Globex").await;
    let team = app.create_team("Vendas", Some(&acme)).await;
    app.create_member("gerente", Role::Manager, Some(team), Some(&acme)).await;
    let ana = app.create_member("ana", Role::User, Some(team), Some(&acme)).await;
    let token = app.login_admin().await;

    let page = app
        .post_form(
            &format!("/agentes/{ana}/edit"),
            &token,
            &[
                ("email", "ana@example.com"),
                ("role", "User"),
                ("team_id", &team.to_string()),
                ("organization", &globex),
            ],
        )
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("different organization"));

    let (organization,): (Option<String>,) =
        sqlx::query_as("SELECT alma_internal_organization FROM user_profiles WHERE id = $1")
            .bind(ana)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(organization.as_deref(), Some(acme.as_str()));

    let page = app
        .post_form(
            &format!("/agentes/{ana}/edit"),
            &token,
            &[
                ("email", "ana@example.com"),
                ("role", "User"),
                ("team_id", ""),
                ("organization", &globex),
            ],
        )
        .await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(app.profile_assignment(ana).await, (None, "User".to_string()));

    common::cleanup(app).await;
}

// ── Teams ───────────────────────────────────────────────────────

#[tokio::test]
async fn director_creates_team_in_own_organization() {
    let app = common::spawn_app().await;
    let org = app.create_organization("Acme").await;
    app.create_member("diretora", Role::Director, None, Some(&org)).await;
    let token = app.login("diretora", common::PASSWORD).await.unwrap();

    let page = app
        .post_form("/teams/new", &token, &[("name", "Inside Sales"), ("description", "")])
        .await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);

    let (organization,): (Option<String>,) =
        sqlx::query_as("SELECT alma_internal_organization FROM teams WHERE name = 'Inside Sales'")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(organization.as_deref(), Some(org.as_str()));

    let page = app
        .post_form("/teams/new", &token, &[("name", "Inside Sales")])
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("already exists"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn deleting_a_team_detaches_its_members() {
    let app = common::spawn_app().await;
    let org = app.create_organization("Acme").await;
    let team = app.create_team("Vendas", Some(&org)).await;
    let manager = app.create_member("gerente", Role::Manager, Some(team), Some(&org)).await;
    let token = app.login_admin().await;

    let page = app.get(&format!("/teams/{team}/delete"), Some(&token)).await;
    assert_eq!(page.status, StatusCode::OK);

    let page = app.post_form(&format!("/teams/{team}/delete"), &token, &[]).await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location.as_deref(), Some("/teams"));
    assert_eq!(
        app.profile_assignment(manager).await,
        (None, "Manager".to_string())
    );

    common::cleanup(app).await;
}

#[tokio::test]
async fn team_with_members_keeps_its_organization() {
    let app = common::spawn_app().await;
    let acme = app.create_organization("Acme").await;
    let globex = app.create_organization("Globex").await;
    let team = app.create_team("Vendas", Some(&acme)).await;
    let manager = app.create_member("gerente", Role::Manager, Some(team), Some(&acme)).await;
    let token = app.login_admin().await;

    let pool = &app.pool;
    let team_organization = || async move {
        let (organization,): (Option<String>,) =
            sqlx::query_as("SELECT alma_internal_organization FROM teams WHERE id = $1")
                .bind(team)
                .fetch_one(pool)
                .await
                .unwrap();
        organization
    };

    let page = app
        .post_form(
            &format!("/teams/{team}/edit"),
            &token,
            &[("name", "Vendas"), ("organization", &globex)],
        )
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("members out before changing its organization"));
    assert_eq!(team_organization().await.as_deref(), Some(acme.as_str()));

    sqlx::query("UPDATE user_profiles SET team_id = NULL WHERE id = $1")
        .bind(manager)
        .execute(&app.pool)
        .await
        .unwrap();

    let page = app
        .post_form(
            &format!("/teams/{team}/edit"),
            &token,
            &[("name", "Vendas"), ("organization", &globex)],
        )
        .await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(team_organization().await.as_deref(), Some(globex.as_str()));

    common::cleanup(app).await;
}

// ── Conversations ───────────────────────────────────────────────

#[tokio::test]
async fn conversations_are_tenant_scoped() {
    let app = common::spawn_app().await;
    let acme = app.create_organization("Acme").await;
    let globex = app.create_organization("Globex").await;
    app.create_member("diretora", Role::Director, None, Some(&acme)).await;

    let ids: Vec<(uuid::Uuid,)> = sqlx::query_as(
        "INSERT INTO conversations (chat_id, alma_internal_organization, metadata)
         VALUES ('chat-acme-1', $1, '{\"tags\": \"vip, retorno\"}'), ('chat-globex-1', $2, '{}')
         RETURNING id",
    )
    .bind(&acme)
    .bind(&globex)
    .fetch_all(&app.pool)
    .await
    .unwrap();
    let globex_conversation = ids[1].0;

    let token = app.login("diretora", common::PASSWORD).await.unwrap();
    let page = app.get("/conversations", Some(&token)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("chat-acme-1"));
    assert!(!page.body.contains("chat-globex-1"));

    let page = app.get("/conversations/chat-acme-1", Some(&token)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("retorno"));

    let page = app
        .get(&format!("/conversations/{globex_conversation}"), Some(&token))
        .await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);

    let admin = app.login_admin().await;
    let page = app.get("/conversations", Some(&admin)).await;
    assert!(page.body.contains("chat-globex-1"));

    let page = app
        .get("/conversations?page=461168601842738792", Some(&admin))
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(!page.body.contains("chat-globex-1"));

    common::cleanup(app).await;
}

// ── Organizations & API keys ────────────────────────────────────

#[tokio::test]
async fn admin_creates_organization_with_director() {
    let app = common::spawn_app().await;
    let token = app.login_admin().await;

    let page = app
        .post_form(
            "/admin-panel/organizations/new",
            &token,
            &[
                ("org_name", "Initech"),
                ("director_username", "lumbergh"),
                ("director_password", "tps-reports"),
                ("director_email", "bill@initech.example"),
            ],
        )
        .await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    let location = page.location.unwrap();
    assert!(location.starts_with("/admin-panel/organizations/"));

    let (team_name, role): (Option<String>, String) = sqlx::query_as(
        "SELECT t.name, p.role FROM user_profiles p
         JOIN users u ON u.id = p.user_id
         LEFT JOIN teams t ON t.id = p.team_id
         WHERE u.username = 'lumbergh'",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(team_name.as_deref(), Some("Initech - Main Team"));
    assert_eq!(role, "Director");

    assert!(app.login("lumbergh", "tps-reports").await.is_some());

    let page = app.get(&location, Some(&token)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("lumbergh"));

    let page = app
        .post_form(
            "/admin-panel/organizations/new",
            &token,
            &[
                ("org_name", "Initech Two"),
                ("director_username", "lumbergh"),
                ("director_password", "tps-reports"),
            ],
        )
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Username already exists"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn api_key_is_shown_once_then_masked() {
    let app = common::spawn_app().await;
    let org = app.create_organization("Acme").await;
    app.create_member("diretora", Role::Director, None, Some(&org)).await;
    let token = app.login("diretora", common::PASSWORD).await.unwrap();

    let page = app
        .post_form("/admin-panel/authorizations/new", &token, &[("key_name", "CRM sync")])
        .await;
    assert_eq!(page.status, StatusCode::OK);

    let (apikey,): (String,) =
        sqlx::query_as(r#"SELECT apikey FROM "authorization" WHERE name = 'CRM sync'"#)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(apikey.len(), 64);
    assert!(page.body.contains(&apikey));

    let list = app.get("/admin-panel/authorizations", Some(&token)).await;
    assert_eq!(list.status, StatusCode::OK);
    assert!(list.body.contains("CRM sync"));
    assert!(!list.body.contains(&apikey));
    assert!(list.body.contains(&apikey[..4]));

    common::cleanup(app).await;
}

#[tokio::test]
async fn director_cannot_delete_foreign_keys() {
    let app = common::spawn_app().await;
    let acme = app.create_organization("Acme").await;
    let globex = app.create_organization("Globex").await;
    app.create_member("diretora", Role::Director, None, Some(&acme)).await;

    let key = alma_crm::db::api_keys::create(
        &app.pool,
        globex.parse().unwrap(),
        "Globex key",
        &alma_crm::db::api_keys::generate_key(),
    )
    .await
    .unwrap();

    let token = app.login("diretora", common::PASSWORD).await.unwrap();
    let page = app
        .post_form(&format!("/admin-panel/authorizations/{}/delete", key.uuid), &token, &[])
        .await;
    assert_eq!(page.status, StatusCode::FORBIDDEN);
    assert!(alma_crm::db::api_keys::find(&app.pool, key.uuid).await.unwrap().is_some());

    common::cleanup(app).await;
}

// ── Analytics ───────────────────────────────────────────────────

#[tokio::test]
async fn gold_dataset_pages() {
    let app = common::spawn_app().await;
    let token = app.login_admin().await;

    let page = app.get("/analytics/gold/sales_velocity", Some(&token)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("avg_days_to_close"));
    assert!(page.body.contains("bruno"));

    let page = app.get("/analytics/gold/churn_risk_monitor", Some(&token)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("No data available"));

    let page = app.get("/analytics/gold/not_a_dataset", Some(&token)).await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}
