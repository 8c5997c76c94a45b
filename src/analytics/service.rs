use std::collections::HashMap;

use crate::analytics::objections::{format_objections, ObjectionSummary};
use crate::analytics::scores::{calculate_agent_scores, team_summary, AgentScores, TeamSummary};
use crate::analytics::stages::{stage_scores, StageScores};
use crate::db;
use crate::models::analysis::SALES_PERFORMANCE;
use crate::models::{AnalysisRecord, FollowUpDetection, Member, SalesStageMetrics};
use crate::stores::{degrade, Stores};

async fn stage_metrics(stores: &Stores, agent_uuid: &str) -> SalesStageMetrics {
    match &stores.events {
        Some(pool) => degrade("events", db::events::sales_stage_metrics(pool, agent_uuid).await),
        None => SalesStageMetrics::default(),
    }
}

async fn followup_detections(stores: &Stores, agent_uuid: &str) -> Vec<FollowUpDetection> {
    match &stores.events {
        Some(pool) => degrade("events", db::events::followup_detections(pool, agent_uuid).await),
        None => Vec::new(),
    }
}

async fn analyses(stores: &Stores, agent_uuid: &str) -> Vec<AnalysisRecord> {
    match &stores.analytics {
        Some(pool) => degrade("analytics", db::analytics::for_agent(pool, agent_uuid).await),
        None => Vec::new(),
    }
}

/// Scores of one member, `None` without an external UUID.
pub async fn agent_scores(stores: &Stores, member: &Member) -> Option<AgentScores> {
    let agent_uuid = member.agent_uuid()?;
    let stages = stage_metrics(stores, agent_uuid).await;
    let followups = followup_detections(stores, agent_uuid).await;
    let analyses = analyses(stores, agent_uuid).await;
    calculate_agent_scores(member, &stages, &followups, &analyses)
}

pub struct AgentDetail {
    pub scores: Option<AgentScores>,
    pub stages: StageScores,
}

pub async fn agent_detail(stores: &Stores, member: &Member) -> AgentDetail {
    let Some(agent_uuid) = member.agent_uuid() else {
        return AgentDetail {
            scores: None,
            stages: StageScores::default(),
        };
    };

    let stages = stage_metrics(stores, agent_uuid).await;
    let followups = followup_detections(stores, agent_uuid).await;
    let analyses = analyses(stores, agent_uuid).await;

    AgentDetail {
        scores: calculate_agent_scores(member, &stages, &followups, &analyses),
        stages: stage_scores(&analyses),
    }
}

pub struct TeamOverview {
    pub agents: Vec<AgentScores>,
    pub summary: TeamSummary,
    pub objections: Vec<ObjectionSummary>,
}

/// Per-agent scores, team totals and objection handling for `members`.
pub async fn team_overview(stores: &Stores, members: &[Member]) -> TeamOverview {
    let mut agents = Vec::new();
    for member in members {
        if let Some(scores) = agent_scores(stores, member).await {
            agents.push(scores);
        }
    }
    let summary = team_summary(&agents);

    let names: HashMap<String, String> = members
        .iter()
        .filter_map(|m| m.agent_uuid().map(|uuid| (uuid.to_string(), m.display_name())))
        .collect();
    let uuids: Vec<String> = names.keys().cloned().collect();

    let records = match &stores.analytics {
        Some(pool) => degrade(
            "analytics",
            db::analytics::by_type_for_agents(pool, SALES_PERFORMANCE, &uuids).await,
        ),
        None => Vec::new(),
    };

    TeamOverview {
        agents,
        summary,
        objections: format_objections(&records, &names),
    }
}
