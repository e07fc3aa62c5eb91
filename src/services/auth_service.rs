use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    dto::auth::{
        Claims, LoginRequest, LoginResponse, RefreshClaims, RefreshRequest, RefreshResponse,
        RegisterRequest, UserSummary,
    },
    entity::{
        user_points::{ActiveModel as PointActive, Column as PointCol, Entity as UserPoints},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    grade::policy_for,
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

const ACCESS_TOKEN_HOURS: i64 = 2;
const REFRESH_TOKEN_DAYS: i64 = 7;

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        email,
        password,
        name,
        role,
    } = payload;

    if role != "buyer" && role != "seller" {
        return Err(AppError::BadRequest(
            "role must be 'buyer' or 'seller'".into(),
        ));
    }

    let exist = Users::find()
        .filter(UserCol::Email.eq(email.clone()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::BadRequest("Email is already taken".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();

    let txn = state.orm.begin().await?;

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(password_hash),
        name: Set(name),
        role: Set(role),
        image_url: Set(None),
        refresh_token: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    // Every account starts at the bottom of the grade ladder.
    let policy = policy_for(0);
    PointActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        points: Set(0),
        accumulated_amount: Set(0),
        grade: Set(policy.grade.as_str().into()),
        point_rate: Set(policy.point_rate),
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "User created",
        user_from_entity(user),
        None,
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;

    let user = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let argon2 = Argon2::default();
    if argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    let access_token = issue_access_token(state, &user)?;
    let refresh_token = issue_refresh_token(state, &user)?;

    let mut active: UserActive = user.clone().into();
    active.refresh_token = Set(Some(refresh_token.clone()));
    active.updated_at = Set(Utc::now().into());
    let user = active.update(&state.orm).await?;

    let point_row = UserPoints::find()
        .filter(PointCol::UserId.eq(user.id))
        .one(&state.orm)
        .await?;
    let (points, grade) = point_row
        .map(|p| (p.points, p.grade))
        .unwrap_or_else(|| (0, policy_for(0).grade.as_str().to_string()));

    let resp = LoginResponse {
        user: UserSummary {
            user: user_from_entity(user),
            points,
            grade,
        },
        access_token,
        refresh_token,
    };

    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

pub async fn refresh_access_token(
    state: &AppState,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<RefreshResponse>> {
    let user = Users::find()
        .filter(UserCol::RefreshToken.eq(payload.refresh_token.clone()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Forbidden)?;

    decode::<RefreshClaims>(
        &payload.refresh_token,
        &DecodingKey::from_secret(state.config.refresh_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired refresh token".into()))?;

    let access_token = issue_access_token(state, &user)?;

    Ok(ApiResponse::success(
        "Token refreshed",
        RefreshResponse { access_token },
        Some(Meta::empty()),
    ))
}

pub async fn logout_user(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let model = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: UserActive = model.into();
    active.refresh_token = Set(None);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Logged out",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn get_me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserSummary>> {
    let model = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let point_row = UserPoints::find()
        .filter(PointCol::UserId.eq(model.id))
        .one(&state.orm)
        .await?;
    let (points, grade) = point_row
        .map(|p| (p.points, p.grade))
        .unwrap_or_else(|| (0, policy_for(0).grade.as_str().to_string()));

    Ok(ApiResponse::success(
        "OK",
        UserSummary {
            user: user_from_entity(model),
            points,
            grade,
        },
        None,
    ))
}

fn issue_access_token(state: &AppState, user: &UserModel) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(ACCESS_TOKEN_HOURS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn issue_refresh_token(state: &AppState, user: &UserModel) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(REFRESH_TOKEN_DAYS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = RefreshClaims {
        sub: user.id.to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.config.refresh_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        email: model.email,
        name: model.name,
        role: model.role,
        image_url: model.image_url,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
