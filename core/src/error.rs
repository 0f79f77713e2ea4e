use crate::types::ResourceId;
use thiserror::Error;

/// One resource the player is short of when a spend is refused.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Shortfall {
    pub resource:  ResourceId,
    pub required:  f64,
    pub available: f64,
}

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Insufficient resources: {}", describe_shortfalls(.shortfalls))]
    InsufficientResources { shortfalls: Vec<Shortfall> },

    #[error("Malformed snapshot: {reason}")]
    MalformedSnapshot { reason: String },

    #[error("Unknown {kind} '{id}'")]
    UnknownIdentifier { kind: &'static str, id: String },

    #[error("Invalid amount {value} for resource '{resource}'")]
    InvalidAmount { resource: ResourceId, value: f64 },

    #[error("Enemy catalog is empty")]
    EmptyEnemyCatalog,

    #[error("Clock is paused")]
    ClockPaused,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimError {
    pub fn unknown(kind: &'static str, id: impl Into<String>) -> Self {
        Self::UnknownIdentifier { kind, id: id.into() }
    }

    pub fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::MalformedSnapshot { reason: reason.to_string() }
    }
}

fn describe_shortfalls(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| format!("{} {}/{}", s.resource, s.available.floor(), s.required))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type SimResult<T> = Result<T, SimError>;
