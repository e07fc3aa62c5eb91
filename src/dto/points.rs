use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct PointSummary {
    pub current_point: i64,
    pub current_grade: String,
    pub next_grade: Option<String>,
    pub remaining_point: i64,
    pub progress_percent: i64,
}
