use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    dto::points::PointSummary,
    entity::user_points::{
        ActiveModel as PointActive, Column as PointCol, Entity as UserPoints, Model as PointModel,
    },
    error::AppResult,
    grade::{next_policy, policy_for},
    middleware::auth::AuthUser,
    response::ApiResponse,
    state::AppState,
};

pub async fn get_my_point_info(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PointSummary>> {
    let point_row = ensure_point_row(state, user.user_id).await?;

    let accumulated = point_row.accumulated_amount;
    let summary = match next_policy(accumulated) {
        Some(next) => PointSummary {
            current_point: point_row.points,
            current_grade: point_row.grade,
            next_grade: Some(next.grade.as_str().to_string()),
            remaining_point: next.min_amount - accumulated,
            // Never show 100% while the next grade has not been reached.
            progress_percent: (accumulated * 100 / next.min_amount).min(99),
        },
        None => PointSummary {
            current_point: point_row.points,
            current_grade: point_row.grade,
            next_grade: None,
            remaining_point: 0,
            progress_percent: 100,
        },
    };

    Ok(ApiResponse::success("OK", summary, None))
}

/// Fetch the point ledger row, creating it lazily for accounts that predate
/// the ledger.
pub async fn ensure_point_row(state: &AppState, user_id: Uuid) -> AppResult<PointModel> {
    let existing = UserPoints::find()
        .filter(PointCol::UserId.eq(user_id))
        .one(&state.orm)
        .await?;

    if let Some(row) = existing {
        return Ok(row);
    }

    let policy = policy_for(0);
    let row = PointActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        points: Set(0),
        accumulated_amount: Set(0),
        grade: Set(policy.grade.as_str().into()),
        point_rate: Set(policy.point_rate),
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(row)
}
