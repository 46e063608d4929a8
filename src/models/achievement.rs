use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An unlocked milestone. `key` is the stable identifier the idempotence
/// guard checks; `name` is the display title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub key: String,
    pub name: String,
    pub unlocked_at: DateTime<Utc>,
}
