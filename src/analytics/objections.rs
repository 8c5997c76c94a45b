use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::analytics::number;
use crate::models::analysis::SALES_PERFORMANCE;
use crate::models::AnalysisRecord;

pub const UNKNOWN_SELLER: &str = "Desconhecido";

/// How one kind of objection is handled across a team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectionSummary {
    pub label: String,
    pub frequency: usize,
    pub score: i64,
    pub best_seller: String,
    pub worst_seller: String,
    pub best_response: String,
}

pub fn label(objection_type: &str) -> String {
    match objection_type {
        "price" => "Preço".to_string(),
        "trust" => "Confiança".to_string(),
        "timing" => "Tempo".to_string(),
        "competitor" => "Concorrente".to_string(),
        "product_fit" => "Adequação".to_string(),
        "other" => "Outro".to_string(),
        "hesitation" => "Hesitação".to_string(),
        other => capitalize(other),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

struct Response {
    seller: String,
    score: f64,
    text: String,
}

#[derive(Default)]
struct Group {
    kind: String,
    total_score: f64,
    /// Seller name -> scores, in first-seen order.
    sellers: Vec<(String, Vec<f64>)>,
    responses: Vec<Response>,
}

impl Group {
    fn add(&mut self, seller: String, score: f64, text: String) {
        self.total_score += score;
        match self.sellers.iter_mut().find(|(name, _)| *name == seller) {
            Some((_, scores)) => scores.push(score),
            None => self.sellers.push((seller.clone(), vec![score])),
        }
        self.responses.push(Response { seller, score, text });
    }

    fn summarize(self) -> Option<ObjectionSummary> {
        let averages: Vec<(&str, f64)> = self
            .sellers
            .iter()
            .map(|(name, scores)| (name.as_str(), scores.iter().sum::<f64>() / scores.len() as f64))
            .collect();

        // Ties keep the first-seen seller.
        let mut best = *averages.first()?;
        let mut worst = best;
        for &(name, avg) in &averages[1..] {
            if avg > best.1 {
                best = (name, avg);
            }
            if avg < worst.1 {
                worst = (name, avg);
            }
        }

        let mut best_response: Option<&Response> = None;
        for response in self.responses.iter().filter(|r| r.seller == best.0) {
            if best_response.is_none_or(|current| response.score > current.score) {
                best_response = Some(response);
            }
        }

        let frequency = self.responses.len();
        Some(ObjectionSummary {
            label: label(&self.kind),
            frequency,
            score: (self.total_score / frequency as f64) as i64,
            best_seller: best.0.to_string(),
            worst_seller: worst.0.to_string(),
            best_response: best_response.map(|r| r.text.clone()).unwrap_or_default(),
        })
    }
}

/// Group the objections of `SALES_PERFORMANCE` records by type, most frequent first.
/// `names` maps an external UUID to the seller's display name.
pub fn format_objections(
    records: &[AnalysisRecord],
    names: &HashMap<String, String>,
) -> Vec<ObjectionSummary> {
    let mut groups: Vec<Group> = Vec::new();

    for record in records.iter().filter(|r| r.is(SALES_PERFORMANCE)) {
        let Some(Value::Array(objections)) =
            record.result.pointer("/objection_details/objections_detected")
        else {
            continue;
        };

        for objection in objections {
            let kind = objection
                .get("objection_type")
                .and_then(Value::as_str)
                .unwrap_or("other");

            let seller_id = record
                .agent_uuid
                .as_deref()
                .filter(|u| !u.is_empty())
                .or_else(|| objection.get("seller_uuid").and_then(Value::as_str))
                .unwrap_or(UNKNOWN_SELLER);
            let seller = names
                .get(seller_id)
                .cloned()
                .unwrap_or_else(|| seller_id.to_string());

            let score = number(objection.get("resolution_quality"));
            let text = objection
                .get("seller_response")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();

            let index = match groups.iter().position(|g| g.kind == kind) {
                Some(index) => index,
                None => {
                    groups.push(Group {
                        kind: kind.to_string(),
                        ..Group::default()
                    });
                    groups.len() - 1
                }
            };
            groups[index].add(seller, score, text);
        }
    }

    let mut summaries: Vec<ObjectionSummary> =
        groups.into_iter().filter_map(Group::summarize).collect();
    summaries.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    summaries
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn record(agent: &str, objections: Value) -> AnalysisRecord {
        AnalysisRecord {
            uuid: Uuid::new_v4(),
            conversation_uuid: None,
            analysis_type: SALES_PERFORMANCE.to_string(),
            result: json!({"objection_details": {"objections_detected": objections}}),
            alma_internal_organization: None,
            created_at: Utc::now(),
            agent_uuid: Some(agent.to_string()),
        }
    }

    #[test]
    fn labels() {
        assert_eq!(label("price"), "Preço");
        assert_eq!(label("product_fit"), "Adequação");
        assert_eq!(label("budget"), "Budget");
        assert_eq!(label("LEGAL"), "Legal");
    }

    #[test]
    fn groups_by_type_and_ranks_sellers() {
        let names = HashMap::from([
            ("a".to_string(), "Ana".to_string()),
            ("b".to_string(), "Bruno".to_string()),
        ]);
        let records = [
            record(
                "a",
                json!([
                    {"objection_type": "price", "resolution_quality": 90, "seller_response": "Parcelamos"},
                    {"objection_type": "price", "resolution_quality": 70, "seller_response": "Desconto"},
                    {"objection_type": "trust", "resolution_quality": 50}
                ]),
            ),
            record(
                "b",
                json!([
                    {"objection_type": "price", "resolution_quality": 40, "seller_response": "Hmm"}
                ]),
            ),
        ];

        let summaries = format_objections(&records, &names);
        assert_eq!(summaries.len(), 2);

        let price = &summaries[0];
        assert_eq!(price.label, "Preço");
        assert_eq!(price.frequency, 3);
        assert_eq!(price.score, 66);
        assert_eq!(price.best_seller, "Ana");
        assert_eq!(price.worst_seller, "Bruno");
        assert_eq!(price.best_response, "Parcelamos");

        assert_eq!(summaries[1].label, "Confiança");
        assert_eq!(summaries[1].frequency, 1);
    }

    #[test]
    fn unknown_sellers_fall_back_to_uuid() {
        let records = [record("zzz", json!([{"resolution_quality": 10}]))];
        let summaries = format_objections(&records, &HashMap::new());
        assert_eq!(summaries[0].label, "Outro");
        assert_eq!(summaries[0].best_seller, "zzz");
    }

    #[test]
    fn no_records_no_summaries() {
        assert!(format_objections(&[], &HashMap::new()).is_empty());
    }
}
