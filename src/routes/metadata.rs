use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{grade::GRADE_POLICIES, response::ApiResponse};

use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct GradeInfo {
    pub grade: String,
    pub min_amount: i64,
    pub point_rate: f64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/grades", axum::routing::get(list_grades))
}

#[utoipa::path(
    get,
    path = "/metadata/grades",
    responses(
        (status = 200, description = "Membership grade table", body = ApiResponse<Vec<GradeInfo>>),
    ),
    tag = "Metadata"
)]
pub async fn list_grades() -> Json<ApiResponse<Vec<GradeInfo>>> {
    let grades = GRADE_POLICIES
        .iter()
        .map(|policy| GradeInfo {
            grade: policy.grade.as_str().to_string(),
            min_amount: policy.min_amount,
            point_rate: policy.point_rate,
        })
        .collect();

    Json(ApiResponse::success("Grades", grades, None))
}
