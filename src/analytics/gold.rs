use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

pub type Row = Map<String, Value>;

/// Precomputed snapshots exported by the data pipeline as JSON arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    CxVolumetrics,
    FrictionHeuristics,
    TemporalHeat,
    ChurnRiskMonitor,
    SalesVelocity,
    SegmentationMatrix,
}

impl Dataset {
    pub const ALL: [Dataset; 6] = [
        Dataset::CxVolumetrics,
        Dataset::FrictionHeuristics,
        Dataset::TemporalHeat,
        Dataset::ChurnRiskMonitor,
        Dataset::SalesVelocity,
        Dataset::SegmentationMatrix,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Dataset::CxVolumetrics => "cx_volumetrics",
            Dataset::FrictionHeuristics => "friction_heuristics",
            Dataset::TemporalHeat => "temporal_heat",
            Dataset::ChurnRiskMonitor => "churn_risk_monitor",
            Dataset::SalesVelocity => "sales_velocity",
            Dataset::SegmentationMatrix => "segmentation_matrix",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Dataset::CxVolumetrics => "CX Volumetrics",
            Dataset::FrictionHeuristics => "Friction Heuristics",
            Dataset::TemporalHeat => "Temporal Heat",
            Dataset::ChurnRiskMonitor => "Churn Risk Monitor",
            Dataset::SalesVelocity => "Sales Velocity",
            Dataset::SegmentationMatrix => "Segmentation Matrix",
        }
    }

    /// File name prefix; exports may carry a date suffix
    /// (`gold_sales_velocity_20251126.json`).
    fn file_stem(&self) -> &'static str {
        match self {
            Dataset::CxVolumetrics => "exploratory_cx_volumetrics",
            Dataset::FrictionHeuristics => "exploratory_friction_heuristics",
            Dataset::TemporalHeat => "exploratory_temporal_heat",
            Dataset::ChurnRiskMonitor => "gold_churn_risk_monitor",
            Dataset::SalesVelocity => "gold_sales_velocity",
            Dataset::SegmentationMatrix => "gold_segmentation_matrix",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dataset::ALL
            .into_iter()
            .find(|d| d.slug() == s)
            .ok_or_else(|| format!("Unknown dataset: {s}"))
    }
}

/// The newest export of `dataset` in `dir`: `{stem}.json` or, among
/// `{stem}_<suffix>.json`, the one whose name sorts last.
async fn find_file(dir: &Path, dataset: Dataset) -> Option<std::path::PathBuf> {
    let stem = dataset.file_stem();
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut newest: Option<String> = None;

    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let Some(rest) = name.strip_prefix(stem) else {
            continue;
        };
        if !(rest == ".json" || (rest.starts_with('_') && rest.ends_with(".json"))) {
            continue;
        }
        if newest.as_deref().is_none_or(|current| name.as_str() > current) {
            newest = Some(name);
        }
    }

    newest.map(|name| dir.join(name))
}

/// Rows of a dataset, or `None` when the file is missing or not a JSON array of objects.
pub async fn load(dir: &Path, dataset: Dataset) -> Option<Vec<Row>> {
    let path = find_file(dir, dataset).await?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Error reading {}: {e}", path.display());
            return None;
        }
    };

    match serde_json::from_slice::<Vec<Row>>(&bytes) {
        Ok(rows) => Some(rows),
        Err(e) => {
            tracing::warn!("Error parsing {}: {e}", path.display());
            None
        }
    }
}

/// At most `max_rows` rows; `None` keeps them all.
pub fn slice(rows: &[Row], max_rows: Option<usize>) -> &[Row] {
    match max_rows {
        Some(max) if max > 0 => &rows[..rows.len().min(max)],
        _ => rows,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
}

/// Columns are taken from the first row.
pub fn summary(rows: &[Row]) -> Summary {
    let Some(first) = rows.first() else {
        return Summary::default();
    };
    let columns: Vec<String> = first.keys().cloned().collect();
    Summary {
        row_count: rows.len(),
        column_count: columns.len(),
        columns,
    }
}
