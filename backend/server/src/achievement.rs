use serde::Serialize;

pub const MILESTONE: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AchievementKind {
    #[serde(rename = "1k-click")]
    ThousandClicks,
}

/// Attached to a click response, e.g. `{ "type": "1k-click", "data": 3000 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Achievement {
    #[serde(rename = "type")]
    pub kind: AchievementKind,
    pub data: u64,
}

/// Evaluated against the optimistic total right after a click is buffered,
/// not against the durable one.
pub fn evaluate(total: u64) -> Option<Achievement> {
    (total != 0 && total % MILESTONE == 0).then_some(Achievement {
        kind: AchievementKind::ThousandClicks,
        data: total,
    })
}
