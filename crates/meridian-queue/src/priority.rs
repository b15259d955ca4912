//! Job priority, urgency metadata and the composite priority score.

use crate::job::Job;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Job priority level, 1 (lowest) to 5 (highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
#[repr(u8)]
pub enum Priority {
    /// Background work.
    Low = 1,
    /// Default.
    Normal = 2,
    High = 3,
    Urgent = 4,
    Critical = 5,
}

impl Priority {
    /// Numeric value, 1 to 5.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl From<u8> for Priority {
    fn from(value: u8) -> Self {
        match value {
            v if v >= 5 => Priority::Critical,
            4 => Priority::Urgent,
            3 => Priority::High,
            2 => Priority::Normal,
            _ => Priority::Low,
        }
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority as u8
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
            Priority::Critical => "critical",
        };
        write!(f, "{}", name)
    }
}

/// Business urgency of a job. Everything but `Normal` has a fast lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    #[default]
    Normal,
    StopLoss,
    Arbitrage,
    MarketClose,
    Liquidation,
}

impl Urgency {
    /// Score multiplier.
    pub const fn multiplier(self) -> f64 {
        match self {
            Urgency::Liquidation => 5.0,
            Urgency::MarketClose => 4.0,
            Urgency::Arbitrage => 3.5,
            Urgency::StopLoss => 3.0,
            Urgency::Normal => 1.0,
        }
    }
}

/// Risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Riskier jobs score higher so they clear the queue sooner.
    pub const fn factor(self) -> f64 {
        match self {
            RiskLevel::Low => 1.0,
            RiskLevel::Medium => 1.2,
            RiskLevel::High => 1.5,
        }
    }
}

/// Expected market impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketImpact {
    #[default]
    Low,
    Medium,
    High,
}

impl MarketImpact {
    /// Score penalty.
    pub const fn penalty(self) -> f64 {
        match self {
            MarketImpact::Low => 1.0,
            MarketImpact::Medium => 0.9,
            MarketImpact::High => 0.8,
        }
    }
}

/// Routing metadata supplied alongside a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorityMetadata {
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub estimated_profit: Option<f64>,
    #[serde(default)]
    pub market_impact: MarketImpact,
}

impl PriorityMetadata {
    /// Metadata with the given urgency and defaults elsewhere.
    pub fn with_urgency(urgency: Urgency) -> Self {
        Self {
            urgency,
            ..Self::default()
        }
    }

    pub fn deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }

    pub fn estimated_profit(mut self, profit: f64) -> Self {
        self.estimated_profit = Some(profit);
        self
    }

    pub fn market_impact(mut self, impact: MarketImpact) -> Self {
        self.market_impact = impact;
        self
    }
}

/// Seconds below which the deadline factor stops growing.
const MIN_DEADLINE_SECS: f64 = 60.0;
/// Deadlines further away than this contribute no boost.
const DEADLINE_HORIZON_SECS: f64 = 3600.0;
/// Profit that doubles the score.
const PROFIT_SCALE: f64 = 10_000.0;
const MAX_PROFIT_FACTOR: f64 = 2.0;

/// Composite priority score at `now`. Higher is more urgent.
///
/// `priority * 100`, scaled by urgency, deadline proximity, profit, risk and
/// market impact, rounded to two decimals.
pub fn priority_score_at(job: &Job, metadata: &PriorityMetadata, now: DateTime<Utc>) -> f64 {
    let base = f64::from(job.priority.as_u8()) * 100.0;

    let time_decay = metadata.deadline.map_or(1.0, |deadline| {
        let secs_left = (deadline - now).num_milliseconds() as f64 / 1000.0;
        (DEADLINE_HORIZON_SECS / secs_left.max(MIN_DEADLINE_SECS)).max(1.0)
    });

    let profit_factor = metadata
        .estimated_profit
        .map_or(1.0, |profit| (1.0 + profit / PROFIT_SCALE).min(MAX_PROFIT_FACTOR));

    let raw = base
        * metadata.urgency.multiplier()
        * time_decay
        * profit_factor
        * metadata.risk_level.factor()
        * metadata.market_impact.penalty();

    (raw * 100.0).round() / 100.0
}

/// Composite priority score using the current time.
pub fn priority_score(job: &Job, metadata: &PriorityMetadata) -> f64 {
    priority_score_at(job, metadata, Utc::now())
}
