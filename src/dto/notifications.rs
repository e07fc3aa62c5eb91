use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Notification;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationFilter {
    All,
    Unread,
    Read,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSort {
    Recent,
    Old,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationList {
    pub items: Vec<Notification>,
}
