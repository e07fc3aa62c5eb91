use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Inquiry;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInquiryRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_secret: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInquiryRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_secret: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplyRequest {
    pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InquiryList {
    pub items: Vec<Inquiry>,
}
