use rand::distr::Alphanumeric;
use rand::Rng;
use sqlx::PgPool;

use crate::db;

pub const SLUG_LEN: usize = 6;
const MAX_ATTEMPTS: usize = 5;

pub fn random_slug() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_LEN)
        .map(char::from)
        .collect()
}

pub fn short_url(base: &str, slug: &str) -> String {
    format!("{}/r/{slug}", base.trim_end_matches('/'))
}

/// The text after `marker` up to the next `separator`.
pub fn conversation_id_from_url<'a>(
    url: &'a str,
    marker: &str,
    separator: &str,
) -> Option<&'a str> {
    let (_, rest) = url.split_once(marker)?;
    Some(rest.split(separator).next().unwrap_or(rest))
}

/// Short link for `original_url`, reusing an existing one for the same seller.
/// Falls back to `original_url` when no link can be stored.
pub async fn create_tracked_link(
    pool: &PgPool,
    short_link_base: &str,
    original_url: &str,
    seller_id: &str,
) -> String {
    match db::followups::find_link(pool, original_url, seller_id).await {
        Ok(Some(existing)) => return short_url(short_link_base, &existing.slug),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!("Error looking up tracked link: {e}");
            return original_url.to_string();
        }
    }

    for _ in 0..MAX_ATTEMPTS {
        let slug = random_slug();
        match db::followups::insert_link(pool, &slug, original_url, seller_id).await {
            Ok(()) => {
                tracing::info!("Created tracked link {slug} for seller {seller_id}");
                return short_url(short_link_base, &slug);
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => continue,
            Err(e) => {
                tracing::warn!("Error creating tracked link: {e}");
                return original_url.to_string();
            }
        }
    }

    tracing::warn!("No free slug after {MAX_ATTEMPTS} attempts");
    original_url.to_string()
}
