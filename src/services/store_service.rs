use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    dto::stores::{CreateStoreRequest, UpdateStoreRequest},
    entity::stores::{
        ActiveModel as StoreActive, Column as StoreCol, Entity as Stores, Model as StoreModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_seller},
    models::Store,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn create_store(
    state: &AppState,
    user: &AuthUser,
    payload: CreateStoreRequest,
) -> AppResult<ApiResponse<Store>> {
    ensure_seller(user)?;

    let existing = Stores::find()
        .filter(StoreCol::SellerId.eq(user.user_id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("A seller may own only one store".into()));
    }

    let store = StoreActive {
        id: Set(Uuid::new_v4()),
        seller_id: Set(user.user_id),
        name: Set(payload.name),
        address: Set(payload.address),
        phone_number: Set(payload.phone_number),
        image_url: Set(payload.image_url),
        description: Set(payload.description),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Store created",
        store_from_entity(store),
        None,
    ))
}

pub async fn get_my_store(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Store>> {
    ensure_seller(user)?;

    let store = Stores::find()
        .filter(StoreCol::SellerId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success("OK", store_from_entity(store), None))
}

pub async fn get_store(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Store>> {
    let store = Stores::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success("OK", store_from_entity(store), None))
}

pub async fn update_my_store(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateStoreRequest,
) -> AppResult<ApiResponse<Store>> {
    ensure_seller(user)?;

    let store = Stores::find()
        .filter(StoreCol::SellerId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: StoreActive = store.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(address) = payload.address {
        active.address = Set(address);
    }
    if let Some(phone_number) = payload.phone_number {
        active.phone_number = Set(phone_number);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Store updated",
        store_from_entity(updated),
        Some(Meta::empty()),
    ))
}

pub fn store_from_entity(model: StoreModel) -> Store {
    Store {
        id: model.id,
        seller_id: model.seller_id,
        name: model.name,
        address: model.address,
        phone_number: model.phone_number,
        image_url: model.image_url,
        description: model.description,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
