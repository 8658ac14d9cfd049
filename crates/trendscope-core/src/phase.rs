use serde::{Deserialize, Serialize};

/// Lifecycle phase of a tracked trend.
///
/// Phases are always derived together with the score; a record never holds a
/// phase inconsistent with its latest score trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendPhase {
    Emerging,
    Growing,
    Peak,
    Declining,
    Dormant,
}

impl TrendPhase {
    /// Evidence strength used to break ties at threshold boundaries.
    ///
    /// When a score trajectory qualifies for two adjacent phases at once, the
    /// phase with the higher rank wins: peak > growing > emerging >
    /// declining > dormant.
    #[must_use]
    pub fn evidence_rank(self) -> u8 {
        match self {
            TrendPhase::Peak => 4,
            TrendPhase::Growing => 3,
            TrendPhase::Emerging => 2,
            TrendPhase::Declining => 1,
            TrendPhase::Dormant => 0,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TrendPhase::Emerging => "emerging",
            TrendPhase::Growing => "growing",
            TrendPhase::Peak => "peak",
            TrendPhase::Declining => "declining",
            TrendPhase::Dormant => "dormant",
        }
    }

    /// Parse a stored phase string; unknown values fall back to `Emerging`.
    ///
    /// Classification is total and never raises, so reading back a malformed
    /// row degrades to the weakest-history phase instead of erroring.
    #[must_use]
    pub fn parse_or_emerging(s: &str) -> Self {
        match s {
            "growing" => TrendPhase::Growing,
            "peak" => TrendPhase::Peak,
            "declining" => TrendPhase::Declining,
            "dormant" => TrendPhase::Dormant,
            _ => TrendPhase::Emerging,
        }
    }
}

impl std::fmt::Display for TrendPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
