use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// An out-of-band event applied to a household outside the monthly cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShockKind {
    /// Every working member stops working. There is no re-employment.
    JobLoss,
    /// Unexpected expense: the magnitude of the amount is subtracted.
    Medical,
    /// Unexpected income: the amount is added as given.
    Windfall,
}

impl ShockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ShockKind::JobLoss => "job_loss",
            ShockKind::Medical => "medical",
            ShockKind::Windfall => "windfall",
        }
    }
}

impl fmt::Display for ShockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShockKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "job_loss" => Ok(ShockKind::JobLoss),
            "medical" => Ok(ShockKind::Medical),
            "windfall" => Ok(ShockKind::Windfall),
            other => Err(EngineError::UnsupportedShockKind(other.to_string())),
        }
    }
}
