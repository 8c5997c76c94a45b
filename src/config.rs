use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub stores: ExternalStores,
    pub jwt_secret: String,
    pub admin_password_hash: Option<String>,
    pub chatbase_secret: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    pub secure_cookies: bool,
    pub log_level: String,
    pub gold_data_dir: PathBuf,
    pub followup_high_priority_limit: usize,
    pub short_link_base_url: String,
    pub infobip_conversation_url: String,
    pub cache_ttl_secs: u64,
}

/// Connection URLs for the stores this app reads but does not migrate.
#[derive(Debug, Clone, Default)]
pub struct ExternalStores {
    pub events: Option<String>,
    pub analytics: Option<String>,
    pub followups: Option<String>,
    pub organizations: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let main_url = database_url(&lookup, "")
            .ok_or_else(|| "Missing required environment variable: DATABASE_URL".to_string())?;

        let stores = ExternalStores {
            events: database_url(&lookup, "EVENTS_"),
            analytics: database_url(&lookup, "ANALYTICS_"),
            followups: database_url(&lookup, "FOLLOWUPS_"),
            organizations: database_url(&lookup, "ORGANIZATIONS_"),
        };

        let jwt_secret = required(&lookup, "JWT_SECRET")?;

        let admin_password_hash = value(&lookup, "ADMIN_PASSWORD_HASH").map(|h| h.to_lowercase());
        if let Some(hash) = &admin_password_hash {
            if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(
                    "Invalid ADMIN_PASSWORD_HASH: expected a SHA-256 hex digest".to_string(),
                );
            }
        }

        let chatbase_secret = value(&lookup, "CHATBASE_SECRET_KEY");

        let host: IpAddr = or_default(&lookup, "ALMA_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid ALMA_HOST: {e}"))?;

        let port: u16 = or_default(&lookup, "ALMA_PORT", "8000")
            .parse()
            .map_err(|e| format!("Invalid ALMA_PORT: {e}"))?;

        let secure_cookies = matches!(
            or_default(&lookup, "ALMA_SECURE_COOKIES", "true").as_str(),
            "true" | "1" | "yes"
        );

        let log_level = or_default(&lookup, "ALMA_LOG_LEVEL", "info");

        let gold_data_dir = PathBuf::from(or_default(&lookup, "GOLD_DATA_DIR", "data/gold_json"));

        let followup_high_priority_limit: usize =
            or_default(&lookup, "FOLLOWUP_HIGH_PRIORITY_LIMIT", "5")
                .parse()
                .map_err(|e| format!("Invalid FOLLOWUP_HIGH_PRIORITY_LIMIT: {e}"))?;

        let short_link_base_url = or_default(
            &lookup,
            "SHORT_LINK_BASE_URL",
            "https://followupsbot-prod.up.railway.app",
        )
        .trim_end_matches('/')
        .to_string();

        let infobip_conversation_url = or_default(
            &lookup,
            "INFOBIP_CONVERSATION_URL",
            "https://portal-ny2.infobip.com/conversations/my-work?conversationId=",
        );

        let cache_ttl_secs: u64 = or_default(&lookup, "CACHE_TTL_SECS", "300")
            .parse()
            .map_err(|e| format!("Invalid CACHE_TTL_SECS: {e}"))?;

        Ok(Config {
            database_url: main_url,
            stores,
            jwt_secret,
            admin_password_hash,
            chatbase_secret,
            host,
            port,
            secure_cookies,
            log_level,
            gold_data_dir,
            followup_high_priority_limit,
            short_link_base_url,
            infobip_conversation_url,
            cache_ttl_secs,
        })
    }
}

/// Read a variable, stripping surrounding quotes. Empty values and unresolved
/// Railway references (`${{...}}`) count as unset.
fn value<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    let trimmed = raw.trim().trim_matches('"').trim_matches('\'').trim();
    if trimmed.is_empty() || trimmed.starts_with("${{") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    value(lookup, key).ok_or_else(|| format!("Missing required environment variable: {key}"))
}

fn or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    value(lookup, key).unwrap_or_else(|| default.to_string())
}

/// `{prefix}DATABASE_URL`, or a URL assembled from `{prefix}DB_NAME`,
/// `{prefix}DB_USER`, `{prefix}DB_PASSWORD`, `{prefix}DB_HOST` and `{prefix}DB_PORT`.
fn database_url<F>(lookup: &F, prefix: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = value(lookup, &format!("{prefix}DATABASE_URL")) {
        return Some(url);
    }

    let name = value(lookup, &format!("{prefix}DB_NAME"))?;
    let user =
        value(lookup, &format!("{prefix}DB_USER")).unwrap_or_else(|| "postgres".to_string());
    let password = value(lookup, &format!("{prefix}DB_PASSWORD")).unwrap_or_default();
    let host =
        value(lookup, &format!("{prefix}DB_HOST")).unwrap_or_else(|| "localhost".to_string());
    let port = value(lookup, &format!("{prefix}DB_PORT")).unwrap_or_else(|| "5432".to_string());

    let credentials = if password.is_empty() {
        user
    } else {
        format!("{user}:{password}")
    };
    Some(format!("postgres://{credentials}@{host}:{port}/{name}"))
}
