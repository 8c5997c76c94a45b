use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::followups::links::{conversation_id_from_url, short_url};
use crate::models::{FollowUpTask, TrackedLink};

pub const HIGH_PRIORITY_SCORE: i32 = 700;
pub const CONVERSATION_ID_MARKER: &str = "conversationId=";
pub const QUERY_SEPARATOR: &str = "&";

#[derive(Debug, Clone, Serialize)]
pub struct PrioritizedTask {
    pub task: FollowUpTask,
    pub link: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Buckets {
    pub high: Vec<PrioritizedTask>,
    pub low: Vec<PrioritizedTask>,
}

/// Key under which a conversation id is matched: trimmed, lower-cased, without dashes.
pub fn normalize_conversation_id(raw: &str) -> String {
    raw.trim().to_lowercase().replace('-', "")
}

/// Normalized conversation id -> short link, for links pointing at a conversation.
pub fn link_index(links: &[TrackedLink], short_link_base: &str) -> HashMap<String, String> {
    links
        .iter()
        .filter_map(|link| {
            let id = conversation_id_from_url(
                &link.original_url,
                CONVERSATION_ID_MARKER,
                QUERY_SEPARATOR,
            )?;
            let key = normalize_conversation_id(id);
            (!key.is_empty()).then(|| (key, short_url(short_link_base, &link.slug)))
        })
        .collect()
}

/// Split tasks into high and low priority in one pass, keeping input order.
///
/// A task is high priority when it is due (`follow_up_date <= now`), scores at
/// least 700 and the high bucket holds fewer than `limit` tasks. Each task
/// links to its tracked short link, or to the conversation in Infobip.
pub fn prioritize(
    tasks: Vec<FollowUpTask>,
    links: &HashMap<String, String>,
    limit: usize,
    now: DateTime<Utc>,
    infobip_conversation_url: &str,
) -> Buckets {
    let mut buckets = Buckets::default();

    for task in tasks {
        let raw_uuid = task.conversation_uuid.as_deref().unwrap_or("");
        let link = links
            .get(&normalize_conversation_id(raw_uuid))
            .filter(|_| !raw_uuid.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| format!("{infobip_conversation_url}{raw_uuid}"));

        let urgent = task.follow_up_date <= now && task.score >= HIGH_PRIORITY_SCORE;
        let entry = PrioritizedTask { task, link };

        if urgent && buckets.high.len() < limit {
            buckets.high.push(entry);
        } else {
            buckets.low.push(entry);
        }
    }

    tracing::debug!(
        "Follow-ups prioritized: {} high, {} low",
        buckets.high.len(),
        buckets.low.len()
    );
    buckets
}
