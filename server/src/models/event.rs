use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Event owned by the surrounding system. The engine only reads its identity,
/// its owner and the display fields joined into booking views.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub title: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
}
