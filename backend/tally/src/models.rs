use serde::{Deserialize, Serialize};

/// Last known durable state of the counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub daily: Daily,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Daily {
    pub amount: u64,
    /// Epoch millis of the last durable increment.
    pub last_update: i64,
}

impl CounterSnapshot {
    pub fn new(total: u64, amount: u64, last_update: i64) -> Self {
        Self {
            daily: Daily {
                amount,
                last_update,
            },
            total,
        }
    }
}

/// Body every DAL route answers with.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IncrementRequest {
    pub amount: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigWrite {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigValue {
    pub value: String,
}
