use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::analytics::{number, round2, truthy};
use crate::models::analysis::{BEST_PRACTICES, SALES_PERFORMANCE, SENTIMENT_ANALYSIS};
use crate::models::{AnalysisRecord, FollowUpDetection, Member, SalesStageMetrics};

/// Performance figures of one agent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentScores {
    pub profile_id: uuid::Uuid,
    pub seller_name: String,
    pub real_name: String,
    pub uuid: String,
    pub total_conversations: i64,
    pub total_sales: i64,
    pub sale_stage_distribution: BTreeMap<String, i64>,
    pub total_followups: i64,
    pub follow_up_rate: f64,
    pub avg_performance: f64,
    pub discount_strategy_rate: f64,
    pub meeting_attempt_rate: f64,
    pub meeting_success_rate: f64,
    pub referral_request_rate: f64,
    pub meetings_scheduled: i64,
    pub referrals_received: i64,
    pub objection_resolution_rate: f64,
}

/// Scores for `agent`, or `None` when it has no external UUID to look data up by.
pub fn calculate_agent_scores(
    agent: &Member,
    stages: &SalesStageMetrics,
    followups: &[FollowUpDetection],
    analyses: &[AnalysisRecord],
) -> Option<AgentScores> {
    let uuid = agent.agent_uuid()?;

    let total_followups: i64 = followups.iter().map(|f| f.count).sum();
    let follow_up_rate = if stages.total_conversations > 0 {
        total_followups as f64 / stages.total_conversations as f64 * 100.0
    } else {
        0.0
    };

    let mut scores = AgentScores {
        profile_id: agent.id,
        seller_name: agent.username.clone(),
        real_name: agent.first_name.clone(),
        uuid: uuid.to_string(),
        total_conversations: stages.total_conversations,
        total_sales: stages.total_sales,
        sale_stage_distribution: stages.raw_stages.clone(),
        total_followups,
        follow_up_rate,
        avg_performance: average_sentiment(analyses),
        objection_resolution_rate: objection_resolution_rate(analyses),
        ..AgentScores::default()
    };
    apply_best_practices(&mut scores, analyses);

    Some(scores)
}

fn average_sentiment(analyses: &[AnalysisRecord]) -> f64 {
    let scores: Vec<f64> = analyses
        .iter()
        .filter(|a| a.is(SENTIMENT_ANALYSIS))
        .filter_map(|a| a.result.get("score").and_then(Value::as_f64))
        .collect();

    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

fn apply_best_practices(scores: &mut AgentScores, analyses: &[AnalysisRecord]) {
    let practices: Vec<&Value> = analyses
        .iter()
        .filter(|a| a.is(BEST_PRACTICES))
        .map(|a| &a.result)
        .filter(|result| result.as_object().is_some_and(|fields| !fields.is_empty()))
        .collect();

    let mut discount_sum = 0.0;
    let mut attempted = 0u32;
    let mut accepted = 0u32;
    let mut referrals_attempted = 0u32;

    for result in &practices {
        discount_sum += number(result.pointer("/discount_strategies/discount_execution_score"));

        if truthy(result.pointer("/meeting_planning/attempted_meeting_scheduling")) {
            attempted += 1;
        }
        if truthy(result.pointer("/meeting_planning/meeting_accepted")) {
            accepted += 1;
        }
        match result.pointer("/meeting_planning/scheduled_datetime") {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if s == "null" => {}
            Some(_) => scores.meetings_scheduled += 1,
        }

        if truthy(result.pointer("/referral_requests/attempted_referral_request")) {
            referrals_attempted += 1;
        }
        scores.referrals_received +=
            number(result.pointer("/referral_requests/referrals_received_count")) as i64;
    }

    let base = practices.len().max(1) as f64;
    scores.discount_strategy_rate = discount_sum / base;
    scores.meeting_attempt_rate = f64::from(attempted) / base * 100.0;
    scores.meeting_success_rate = f64::from(accepted) / base * 100.0;
    scores.referral_request_rate = f64::from(referrals_attempted) / base * 100.0;
}

fn objection_resolution_rate(analyses: &[AnalysisRecord]) -> f64 {
    let mut total = 0u32;
    let mut resolved = 0u32;

    for record in analyses.iter().filter(|a| a.is(SALES_PERFORMANCE)) {
        let Some(Value::Array(objections)) =
            record.result.pointer("/objection_details/objections_detected")
        else {
            continue;
        };
        for objection in objections {
            total += 1;
            if truthy(objection.get("resolved")) {
                resolved += 1;
            }
        }
    }

    if total == 0 {
        0.0
    } else {
        f64::from(resolved) / f64::from(total) * 100.0
    }
}

/// Team-wide totals over the scores of its agents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamSummary {
    pub total_conversations: i64,
    pub total_sales: i64,
    pub conversion_rate: f64,
    pub total_followups: i64,
    pub total_meetings: i64,
    pub avg_performance: f64,
}

/// Only agents with a positive performance count towards the average.
pub fn team_summary(agents: &[AgentScores]) -> TeamSummary {
    let mut summary = TeamSummary::default();
    let mut performance_sum = 0.0;
    let mut active_agents = 0u32;

    for agent in agents {
        summary.total_conversations += agent.total_conversations;
        summary.total_sales += agent.total_sales;
        summary.total_followups += agent.total_followups;
        summary.total_meetings += agent.meetings_scheduled;
        if agent.avg_performance > 0.0 {
            performance_sum += agent.avg_performance;
            active_agents += 1;
        }
    }

    if summary.total_conversations > 0 {
        summary.conversion_rate = round2(
            summary.total_sales as f64 / summary.total_conversations as f64 * 100.0,
        );
    }
    summary.avg_performance = round2(performance_sum / f64::from(active_agents.max(1)));
    summary
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::models::Role;
    use crate::models::analysis::STAGE_SCORE;

    fn member(external_uuid: Option<&str>) -> Member {
        Member {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: Role::User,
            team_id: None,
            team_name: None,
            external_uuid: external_uuid.map(str::to_string),
            alma_internal_uuid: None,
            alma_internal_organization: None,
            cell_phone: None,
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Souza".to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn record(analysis_type: &str, result: Value) -> AnalysisRecord {
        AnalysisRecord {
            uuid: Uuid::new_v4(),
            conversation_uuid: None,
            analysis_type: analysis_type.to_string(),
            result,
            alma_internal_organization: None,
            created_at: Utc::now(),
            agent_uuid: Some("agent-1".to_string()),
        }
    }

    fn stages(conversations: i64, sales: i64) -> SalesStageMetrics {
        SalesStageMetrics {
            total_conversations: conversations,
            total_sales: sales,
            raw_stages: BTreeMap::new(),
        }
    }

    fn scores_for(analyses: &[AnalysisRecord]) -> AgentScores {
        calculate_agent_scores(&member(Some("agent-1")), &stages(0, 0), &[], analyses).unwrap()
    }

    #[test]
    fn agent_without_external_uuid_has_no_scores() {
        assert!(calculate_agent_scores(&member(None), &stages(1, 1), &[], &[]).is_none());
        assert!(calculate_agent_scores(&member(Some("  ")), &stages(1, 1), &[], &[]).is_none());
    }

    #[test]
    fn empty_data_gives_zero_rates() {
        let scores = scores_for(&[]);
        assert_eq!(scores.follow_up_rate, 0.0);
        assert_eq!(scores.avg_performance, 0.0);
        assert_eq!(scores.discount_strategy_rate, 0.0);
        assert_eq!(scores.meeting_attempt_rate, 0.0);
        assert_eq!(scores.objection_resolution_rate, 0.0);
        assert_eq!(scores.meetings_scheduled, 0);
    }

    #[test]
    fn follow_up_rate_uses_conversation_count() {
        let followups = [
            FollowUpDetection { agent_uuid: "agent-1".into(), count: 3 },
            FollowUpDetection { agent_uuid: "agent-1".into(), count: 2 },
        ];
        let agent = member(Some(" agent-1 "));
        let scores = calculate_agent_scores(&agent, &stages(10, 2), &followups, &[]).unwrap();
        assert_eq!(scores.uuid, "agent-1");
        assert_eq!(scores.total_followups, 5);
        assert_eq!(scores.follow_up_rate, 50.0);
    }

    #[test]
    fn sentiment_average_skips_records_without_score() {
        let analyses = [
            record(SENTIMENT_ANALYSIS, json!({"score": 80})),
            record(SENTIMENT_ANALYSIS, json!({"score": 60.0})),
            record(SENTIMENT_ANALYSIS, json!({})),
            record(STAGE_SCORE, json!({"score": 1})),
        ];
        let scores = scores_for(&analyses);
        assert_eq!(scores.avg_performance, 70.0);
    }

    #[test]
    fn best_practice_rates() {
        let analyses = [
            record(
                BEST_PRACTICES,
                json!({
                    "discount_strategies": {"discount_execution_score": 8},
                    "meeting_planning": {
                        "attempted_meeting_scheduling": true,
                        "meeting_accepted": "true",
                        "scheduled_datetime": "2025-11-20T10:00:00"
                    },
                    "referral_requests": {
                        "attempted_referral_request": "true",
                        "referrals_received_count": 2
                    }
                }),
            ),
            record(
                BEST_PRACTICES,
                json!({
                    "discount_strategies": {"discount_execution_score": null},
                    "meeting_planning": {
                        "attempted_meeting_scheduling": "false",
                        "scheduled_datetime": "null"
                    },
                    "referral_requests": {"referrals_received_count": 1}
                }),
            ),
        ];
        let scores = scores_for(&analyses);
        assert_eq!(scores.discount_strategy_rate, 4.0);
        assert_eq!(scores.meeting_attempt_rate, 50.0);
        assert_eq!(scores.meeting_success_rate, 50.0);
        assert_eq!(scores.referral_request_rate, 50.0);
        assert_eq!(scores.meetings_scheduled, 1);
        assert_eq!(scores.referrals_received, 3);
    }

    #[test]
    fn empty_best_practice_results_are_not_counted() {
        let analyses = [
            record(
                BEST_PRACTICES,
                json!({"meeting_planning": {"attempted_meeting_scheduling": true}}),
            ),
            record(BEST_PRACTICES, json!({})),
            record(BEST_PRACTICES, Value::Null),
        ];
        let scores = scores_for(&analyses);
        assert_eq!(scores.meeting_attempt_rate, 100.0);
        assert_eq!(scores.meeting_success_rate, 0.0);
    }

    #[test]
    fn objection_resolution_rate_counts_resolved() {
        let analyses = [record(
            SALES_PERFORMANCE,
            json!({"objection_details": {"objections_detected": [
                {"objection_type": "price", "resolved": true},
                {"objection_type": "trust", "resolved": "true"},
                {"objection_type": "timing", "resolved": false},
                {"objection_type": "other"}
            ]}}),
        )];
        let scores = scores_for(&analyses);
        assert_eq!(scores.objection_resolution_rate, 50.0);
    }

    fn agent(performance: f64, conversations: i64, sales: i64) -> AgentScores {
        AgentScores {
            avg_performance: performance,
            total_conversations: conversations,
            total_sales: sales,
            ..AgentScores::default()
        }
    }

    #[test]
    fn team_summary_ignores_inactive_performance() {
        let summary = team_summary(&[agent(80.0, 10, 2), agent(0.0, 5, 1)]);
        assert_eq!(summary.total_conversations, 15);
        assert_eq!(summary.total_sales, 3);
        assert_eq!(summary.conversion_rate, 20.0);
        assert_eq!(summary.avg_performance, 80.0);
    }

    #[test]
    fn empty_team_summary_is_zero() {
        assert_eq!(team_summary(&[]), TeamSummary::default());
    }

    #[test]
    fn team_summary_rounds_rates() {
        let summary = team_summary(&[agent(70.0, 3, 1), agent(75.56, 0, 0)]);
        assert_eq!(summary.conversion_rate, 33.33);
        assert_eq!(summary.avg_performance, 72.78);
    }
}
