//! Utilization Optimizer - rule-based efficiency recommendations

use serde::{Deserialize, Serialize};

/// Target utilization rate
pub const OPTIMAL_UTILIZATION: f64 = 0.85;

/// Used when no utilization history is available
const DEFAULT_UTILIZATION: f64 = 0.5;

const RELOCATE_BELOW: f64 = 0.6;
const MAX_LOCATION_CHANGES: i64 = 5;
const MAX_MAINTENANCE_EVENTS: i64 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationRecord {
    /// Samples in [0, 1], oldest first
    pub historical_utilization: Vec<f64>,
    pub location_changes: i64,
    pub maintenance_events: i64,
    pub operational_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    Relocate,
    StabilizeLocation,
    PreventiveMaintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub description: String,
    pub expected_improvement: f64,
    pub implementation_effort: Effort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub current_utilization: f64,
    pub optimal_utilization: f64,
    pub efficiency_score: f64,
    pub recommendations: Vec<Recommendation>,
    pub potential_savings: f64,
}

struct Rule {
    kind: RecommendationType,
    description: &'static str,
    expected_improvement: f64,
    effort: Effort,
    savings: f64,
}

static RELOCATE: Rule = Rule {
    kind: RecommendationType::Relocate,
    description: "Consider relocating asset to higher-demand area",
    expected_improvement: 0.2,
    effort: Effort::Medium,
    savings: 1500.0,
};

static STABILIZE_LOCATION: Rule = Rule {
    kind: RecommendationType::StabilizeLocation,
    description: "Reduce frequent relocations to improve efficiency",
    expected_improvement: 0.1,
    effort: Effort::Low,
    savings: 800.0,
};

static PREVENTIVE_MAINTENANCE: Rule = Rule {
    kind: RecommendationType::PreventiveMaintenance,
    description: "Implement preventive maintenance to reduce downtime",
    expected_improvement: 0.15,
    effort: Effort::High,
    savings: 2000.0,
};

impl Rule {
    fn recommendation(&self) -> Recommendation {
        Recommendation {
            kind: self.kind,
            description: self.description.to_string(),
            expected_improvement: self.expected_improvement,
            implementation_effort: self.effort,
        }
    }
}

pub fn mean_utilization(history: &[f64]) -> f64 {
    if history.is_empty() {
        DEFAULT_UTILIZATION
    } else {
        history.iter().sum::<f64>() / history.len() as f64
    }
}

/// Score current utilization against the target and fire every matching rule
pub fn optimize_utilization(record: &UtilizationRecord) -> OptimizationResult {
    let current_utilization = mean_utilization(&record.historical_utilization);
    let efficiency_score = (current_utilization / OPTIMAL_UTILIZATION).min(1.0);

    let fired: Vec<&Rule> = [
        (current_utilization < RELOCATE_BELOW, &RELOCATE),
        (record.location_changes > MAX_LOCATION_CHANGES, &STABILIZE_LOCATION),
        (record.maintenance_events > MAX_MAINTENANCE_EVENTS, &PREVENTIVE_MAINTENANCE),
    ]
    .into_iter()
    .filter_map(|(triggered, rule)| triggered.then_some(rule))
    .collect();

    OptimizationResult {
        current_utilization,
        optimal_utilization: OPTIMAL_UTILIZATION,
        efficiency_score,
        recommendations: fired.iter().map(|r| r.recommendation()).collect(),
        potential_savings: fired.iter().map(|r| r.savings).sum(),
    }
}
