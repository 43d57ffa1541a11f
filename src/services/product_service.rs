use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::dto::products::{CreateProductRequest, ProductList, UpdateProductRequest};
use crate::{
    audit::record_audit,
    entity::products::{ActiveModel, Column, Entity as Products},
    error::{AppError, AppResult},
    middleware::{
        access::{Action, Resource, ensure_capability},
        auth::AuthUser,
    },
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    services::upload_service::{ImageUpload, PRODUCT_IMAGE_FOLDER, validate_image},
    state::AppState,
};

fn non_negative(field: &str, value: i64) -> AppResult<()> {
    if value < 0 {
        return Err(AppError::BadRequest(format!("{field} must not be negative")));
    }
    Ok(())
}

fn validate_create(payload: &CreateProductRequest) -> AppResult<()> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    if payload.brand.trim().is_empty() {
        return Err(AppError::BadRequest("brand is required".into()));
    }
    if payload.category.trim().is_empty() {
        return Err(AppError::BadRequest("category is required".into()));
    }
    non_negative("price", payload.price)?;
    non_negative("volume", payload.volume.into())?;
    non_negative("stock", payload.stock.into())?;
    if let Some(original_price) = payload.original_price {
        non_negative("original_price", original_price)?;
    }
    Ok(())
}

fn validate_update(payload: &UpdateProductRequest) -> AppResult<()> {
    if let Some(price) = payload.price {
        non_negative("price", price)?;
    }
    if let Some(volume) = payload.volume {
        non_negative("volume", volume.into())?;
    }
    if let Some(stock) = payload.stock {
        non_negative("stock", stock.into())?;
    }
    if let Some(original_price) = payload.original_price {
        non_negative("original_price", original_price)?;
    }
    Ok(())
}

fn filter_condition(query: &ProductQuery) -> Condition {
    let mut condition = Condition::all();

    if let Some(search) = query.search.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Brand).ilike(pattern.clone()))
                .add(Expr::col(Column::FragranceType).ilike(pattern)),
        );
    }
    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Category.eq(category.clone()));
    }
    if let Some(brand) = query.brand.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Brand.eq(brand.clone()));
    }
    if let Some(fragrance_type) = query.fragrance_type.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::FragranceType.eq(fragrance_type.clone()));
    }
    if let Some(is_featured) = query.is_featured {
        condition = condition.add(Column::IsFeatured.eq(is_featured));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    condition
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query
        .pagination()
        .normalize_with(ProductQuery::DEFAULT_LIMIT);

    let (sort_by, sort_order) = query.sorting();
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
        ProductSortBy::Rating => Column::Rating,
    };

    let mut finder = Products::find().filter(filter_condition(&query));
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };
    // Stable pages when the sort key ties.
    finder = finder.order_by_asc(Column::Id);

    let total = finder.clone().count(state.db()).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(state.db())
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(state.db())
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    Ok(ApiResponse::success("Product", Product::from(product), None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_capability(user, Resource::Products, Action::Create)?;
    validate_create(&payload)?;

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        brand: Set(payload.brand),
        description: Set(payload.description),
        category: Set(payload.category),
        fragrance_type: Set(payload.fragrance_type),
        volume: Set(payload.volume),
        price: Set(payload.price),
        original_price: Set(payload.original_price),
        stock: Set(payload.stock),
        ingredients: Set(payload.ingredients),
        top_notes: Set(payload.top_notes),
        middle_notes: Set(payload.middle_notes),
        base_notes: Set(payload.base_notes),
        image: Set(payload.image),
        rating: Set(0.0),
        is_featured: Set(payload.is_featured),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(state.db())
    .await?;

    record_audit(
        state.db(),
        user.user_id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created successfully",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_capability(user, Resource::Products, Action::Update)?;
    validate_update(&payload)?;

    let existing = Products::find_by_id(id)
        .one(state.db())
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(brand) = payload.brand {
        active.brand = Set(brand);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(fragrance_type) = payload.fragrance_type {
        active.fragrance_type = Set(Some(fragrance_type));
    }
    if let Some(volume) = payload.volume {
        active.volume = Set(volume);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(original_price) = payload.original_price {
        active.original_price = Set(Some(original_price));
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(ingredients) = payload.ingredients {
        active.ingredients = Set(ingredients);
    }
    if let Some(top_notes) = payload.top_notes {
        active.top_notes = Set(top_notes);
    }
    if let Some(middle_notes) = payload.middle_notes {
        active.middle_notes = Set(middle_notes);
    }
    if let Some(base_notes) = payload.base_notes {
        active.base_notes = Set(base_notes);
    }
    if let Some(image) = payload.image {
        active.image = Set(image);
    }
    if let Some(is_featured) = payload.is_featured {
        active.is_featured = Set(is_featured);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(state.db()).await?;

    record_audit(
        state.db(),
        user.user_id,
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product updated successfully",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    ensure_capability(user, Resource::Products, Action::Delete)?;

    let existing = Products::find_by_id(id)
        .one(state.db())
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    Products::delete_by_id(id).exec(state.db()).await?;

    record_audit(
        state.db(),
        user.user_id,
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product deleted successfully",
        Product::from(existing),
        Some(Meta::empty()),
    ))
}

pub async fn upload_product_image(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    image: ImageUpload,
) -> AppResult<ApiResponse<Product>> {
    ensure_capability(user, Resource::Products, Action::Update)?;
    validate_image(Some(&image.file_name), Some(&image.content_type))?;

    let existing = Products::find_by_id(id)
        .one(state.db())
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    let image_url = state.images.upload(PRODUCT_IMAGE_FOLDER, image).await?;

    let mut active: ActiveModel = existing.into();
    active.image = Set(image_url);
    active.updated_at = Set(Utc::now().into());
    let product = active.update(state.db()).await?;

    Ok(ApiResponse::success(
        "Product image uploaded successfully",
        Product::from(product),
        Some(Meta::empty()),
    ))
}
