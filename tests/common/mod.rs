use std::net::SocketAddr;
use std::path::PathBuf;

use reqwest::header::{LOCATION, SET_COOKIE};
use reqwest::{Client, StatusCode};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use alma_crm::auth::{admin_backend, password};
use alma_crm::config::{Config, ExternalStores};
use alma_crm::db;
use alma_crm::db::profiles::NewProfile;
use alma_crm::models::Role;
use alma_crm::stores::Stores;

pub const ADMIN_PASSWORD: &str = "admin-test-password";
pub const PASSWORD: &str = "password123";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
}

/// Status, `Location` header and body of a response.
pub struct Page {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Post the login form and return the session token, if one was issued.
    pub async fn login(&self, username: &str, password: &str) -> Option<String> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .expect("login request failed");

        resp.headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|cookie| {
                let value = cookie.strip_prefix("access_token=")?;
                let token = value.split(';').next()?;
                (!token.is_empty()).then(|| token.to_string())
            })
    }

    pub async fn login_admin(&self) -> String {
        self.login("admin", ADMIN_PASSWORD)
            .await
            .expect("admin login failed")
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Page {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        page(req.send().await.expect("get request failed")).await
    }

    pub async fn post_form(&self, path: &str, token: &str, form: &[(&str, &str)]) -> Page {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .form(form)
            .send()
            .await
            .expect("post request failed");
        page(resp).await
    }

    /// Organization row in the organizations store.
    pub async fn create_organization(&self, name: &str) -> String {
        db::organizations::create(&self.pool, name, serde_json::json!({}))
            .await
            .expect("create organization failed")
            .uuid
            .to_string()
    }

    pub async fn create_team(&self, name: &str, organization: Option<&str>) -> Uuid {
        db::teams::create(&self.pool, name, None, organization)
            .await
            .expect("create team failed")
            .id
    }

    /// User with a profile, bypassing the leadership check. Returns the profile id.
    pub async fn create_member(
        &self,
        username: &str,
        role: Role,
        team_id: Option<Uuid>,
        organization: Option<&str>,
    ) -> Uuid {
        let hash = password::hash(PASSWORD).expect("hash failed");
        let user = db::users::create(
            &self.pool,
            username,
            &format!("{username}@example.com"),
            "",
            "",
            Some(hash.as_str()),
        )
        .await
        .expect("create user failed");

        db::profiles::create(
            &self.pool,
            &NewProfile {
                user_id: user.id,
                role,
                team_id,
                organization,
                external_uuid: None,
                cell_phone: None,
            },
        )
        .await
        .expect("create profile failed")
        .id
    }

    pub async fn profile_assignment(&self, profile_id: Uuid) -> (Option<Uuid>, String) {
        sqlx::query_as("SELECT team_id, role FROM user_profiles WHERE id = $1")
            .bind(profile_id)
            .fetch_one(&self.pool)
            .await
            .expect("profile lookup failed")
    }
}

async fn page(resp: reqwest::Response) -> Page {
    let status = resp.status();
    let location = resp
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = resp.text().await.unwrap_or_default();
    Page {
        status,
        location,
        body,
    }
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Spawn a test app with a fresh temporary database serving every store.
pub async fn spawn_app() -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    // Create a unique test database
    let db_name = format!("alma_test_{}", Uuid::now_v7().to_string().replace('-', ""));

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    sqlx::raw_sql(include_str!("../../schema/external.sql"))
        .execute(&pool)
        .await
        .expect("Failed to create external tables");

    let config = Config {
        database_url: test_url,
        stores: ExternalStores::default(),
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        admin_password_hash: Some(admin_backend::sha256_hex(ADMIN_PASSWORD)),
        chatbase_secret: None,
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        secure_cookies: false,
        log_level: "warn".to_string(),
        gold_data_dir: PathBuf::from("tests/data/gold"),
        followup_high_priority_limit: 5,
        short_link_base_url: "https://links.example".to_string(),
        infobip_conversation_url: "https://portal.example/conversations?conversationId="
            .to_string(),
        cache_ttl_secs: 60,
    };

    let app = alma_crm::build_app(Stores::single(pool.clone()), config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
