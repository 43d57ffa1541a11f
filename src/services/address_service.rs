use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    dto::addresses::{AddressList, CreateAddressRequest, UpdateAddressRequest},
    entity::addresses::{
        ActiveModel as AddressActive, Column as AddressCol, Entity as Addresses, Model as AddressModel,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Address,
    response::{ApiResponse, Meta},
    state::AppState,
};

fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

fn validate_create(payload: &CreateAddressRequest) -> AppResult<()> {
    require("full_name", &payload.full_name)?;
    require("phone", &payload.phone)?;
    require("pincode", &payload.pincode)?;
    require("state", &payload.state)?;
    require("city", &payload.city)?;
    require("address_line", &payload.address_line)
}

/// Scoped to the caller; another user's address is indistinguishable from a missing one.
pub(crate) async fn find_owned<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    id: Uuid,
) -> AppResult<Option<AddressModel>> {
    let address = Addresses::find_by_id(id)
        .filter(AddressCol::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(address)
}

pub(crate) async fn find_default<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> AppResult<Option<AddressModel>> {
    let address = Addresses::find()
        .filter(AddressCol::UserId.eq(user_id))
        .filter(AddressCol::IsDefault.eq(true))
        .one(db)
        .await?;
    Ok(address)
}

async fn clear_default<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<()> {
    // Lock the user's rows so concurrent default switches serialize.
    Addresses::find()
        .filter(AddressCol::UserId.eq(user_id))
        .lock(LockType::Update)
        .all(db)
        .await?;
    Addresses::update_many()
        .col_expr(AddressCol::IsDefault, Expr::value(false))
        .filter(AddressCol::UserId.eq(user_id))
        .filter(AddressCol::IsDefault.eq(true))
        .exec(db)
        .await?;
    Ok(())
}

async fn address_list<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<AddressList> {
    let items = Addresses::find()
        .filter(AddressCol::UserId.eq(user_id))
        .order_by_asc(AddressCol::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(Address::from)
        .collect();
    Ok(AddressList { items })
}

pub async fn list_addresses(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<AddressList>> {
    let list = address_list(state.db(), user.user_id).await?;
    Ok(ApiResponse::success("OK", list, Some(Meta::empty())))
}

pub async fn get_address(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Address>> {
    let address = find_owned(state.db(), user.user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Address"))?;
    Ok(ApiResponse::success("OK", Address::from(address), Some(Meta::empty())))
}

pub async fn add_address(
    state: &AppState,
    user: &AuthUser,
    payload: CreateAddressRequest,
) -> AppResult<ApiResponse<AddressList>> {
    validate_create(&payload)?;
    let txn = state.db().begin().await?;

    if payload.is_default {
        clear_default(&txn, user.user_id).await?;
    }

    AddressActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        label: Set(payload.label),
        full_name: Set(payload.full_name),
        phone: Set(payload.phone),
        pincode: Set(payload.pincode),
        state: Set(payload.state),
        city: Set(payload.city),
        address_line: Set(payload.address_line),
        landmark: Set(payload.landmark),
        is_default: Set(payload.is_default),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let list = address_list(&txn, user.user_id).await?;
    txn.commit().await?;

    Ok(ApiResponse::success("Address added successfully", list, Some(Meta::empty())))
}

pub async fn update_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateAddressRequest,
) -> AppResult<ApiResponse<AddressList>> {
    let txn = state.db().begin().await?;

    let existing = find_owned(&txn, user.user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Address"))?;

    if payload.is_default == Some(true) && !existing.is_default {
        clear_default(&txn, user.user_id).await?;
    }

    let mut active: AddressActive = existing.into();
    if let Some(label) = payload.label {
        active.label = Set(label);
    }
    if let Some(full_name) = payload.full_name {
        require("full_name", &full_name)?;
        active.full_name = Set(full_name);
    }
    if let Some(phone) = payload.phone {
        require("phone", &phone)?;
        active.phone = Set(phone);
    }
    if let Some(pincode) = payload.pincode {
        require("pincode", &pincode)?;
        active.pincode = Set(pincode);
    }
    if let Some(region) = payload.state {
        require("state", &region)?;
        active.state = Set(region);
    }
    if let Some(city) = payload.city {
        require("city", &city)?;
        active.city = Set(city);
    }
    if let Some(address_line) = payload.address_line {
        require("address_line", &address_line)?;
        active.address_line = Set(address_line);
    }
    if let Some(landmark) = payload.landmark {
        active.landmark = Set(Some(landmark));
    }
    if let Some(is_default) = payload.is_default {
        active.is_default = Set(is_default);
    }
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    let list = address_list(&txn, user.user_id).await?;
    txn.commit().await?;

    Ok(ApiResponse::success("Address updated successfully", list, Some(Meta::empty())))
}

pub async fn delete_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<AddressList>> {
    let result = Addresses::delete_many()
        .filter(AddressCol::Id.eq(id))
        .filter(AddressCol::UserId.eq(user.user_id))
        .exec(state.db())
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Address"));
    }

    let list = address_list(state.db(), user.user_id).await?;
    Ok(ApiResponse::success("Address deleted successfully", list, Some(Meta::empty())))
}
