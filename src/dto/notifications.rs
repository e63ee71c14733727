use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Notification;

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationList {
    pub items: Vec<Notification>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClearOldQuery {
    /// Age threshold in days, default 30.
    pub days: Option<i64>,
}
