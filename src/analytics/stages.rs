use serde::Serialize;
use serde_json::Value;

use crate::models::analysis::STAGE_SCORE;
use crate::models::AnalysisRecord;

pub const TEAM_AVERAGE_PLACEHOLDER: f64 = 50.0;

/// Radar-chart series for the sales stages of one agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageScores {
    pub labels: Vec<String>,
    pub agent_data: Vec<f64>,
    pub team_avg: Vec<f64>,
}

pub fn stage_label(key: &str) -> String {
    match key {
        "closing" => "Fechamento".to_string(),
        "connection" => "Conexão".to_string(),
        "explanation" => "Explicação".to_string(),
        "objection_handling" => "Contorno de Objeções".to_string(),
        other => title_case(&other.replace('_', " ")),
    }
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Series from the first `STAGE_SCORE` analysis. The team series is a flat
/// placeholder until team averages are computed.
pub fn stage_scores(analyses: &[AnalysisRecord]) -> StageScores {
    let Some(Value::Object(result)) = analyses
        .iter()
        .find(|a| a.is(STAGE_SCORE))
        .map(|a| &a.result)
    else {
        return StageScores::default();
    };

    let mut scores = StageScores::default();
    for (key, value) in result {
        scores.labels.push(stage_label(key));
        scores.agent_data.push(value.as_f64().unwrap_or(0.0));
        scores.team_avg.push(TEAM_AVERAGE_PLACEHOLDER);
    }
    scores
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn record(analysis_type: &str, result: Value) -> AnalysisRecord {
        AnalysisRecord {
            uuid: Uuid::new_v4(),
            conversation_uuid: None,
            analysis_type: analysis_type.to_string(),
            result,
            alma_internal_organization: None,
            created_at: Utc::now(),
            agent_uuid: None,
        }
    }

    #[test]
    fn labels_are_translated_or_title_cased() {
        assert_eq!(stage_label("objection_handling"), "Contorno de Objeções");
        assert_eq!(stage_label("needs_discovery"), "Needs Discovery");
    }

    #[test]
    fn uses_first_stage_score_record() {
        let analyses = [
            record("SENTIMENT_ANALYSIS", json!({"score": 10})),
            record(STAGE_SCORE, json!({"closing": 70, "connection": 85.5})),
            record(STAGE_SCORE, json!({"closing": 10})),
        ];
        let scores = stage_scores(&analyses);
        assert_eq!(scores.labels, vec!["Fechamento", "Conexão"]);
        assert_eq!(scores.agent_data, vec![70.0, 85.5]);
        assert_eq!(scores.team_avg, vec![50.0, 50.0]);
    }

    #[test]
    fn no_stage_scores_is_empty() {
        assert_eq!(stage_scores(&[]), StageScores::default());
    }
}
