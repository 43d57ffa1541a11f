use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    addresses, order_items, orders,
    orders::ShippingAddress,
    products, reviews, users,
};

/// Public view of an account; never carries the password hash or reset OTP.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub profile_image: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: String,
    pub full_name: String,
    pub phone: String,
    pub pincode: String,
    pub state: String,
    pub city: String,
    pub address_line: String,
    pub landmark: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub description: Option<String>,
    pub category: String,
    pub fragrance_type: Option<String>,
    pub volume: i32,
    pub price: i64,
    pub original_price: Option<i64>,
    pub stock: i32,
    pub ingredients: Vec<String>,
    pub top_notes: Vec<String>,
    pub middle_notes: Vec<String>,
    pub base_notes: Vec<String>,
    pub image: String,
    pub rating: f64,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub payment_status: String,
    pub order_status: String,
    pub total_amount: i64,
    pub transaction_id: Option<String>,
    pub tracking_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub image: String,
    pub price: i64,
    pub quantity: i32,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            profile_image: model.profile_image,
            phone: model.phone,
            gender: model.gender,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<addresses::Model> for Address {
    fn from(model: addresses::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            label: model.label,
            full_name: model.full_name,
            phone: model.phone,
            pincode: model.pincode,
            state: model.state,
            city: model.city,
            address_line: model.address_line,
            landmark: model.landmark,
            is_default: model.is_default,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<&addresses::Model> for ShippingAddress {
    fn from(model: &addresses::Model) -> Self {
        Self {
            label: model.label.clone(),
            full_name: model.full_name.clone(),
            phone: model.phone.clone(),
            pincode: model.pincode.clone(),
            state: model.state.clone(),
            city: model.city.clone(),
            address_line: model.address_line.clone(),
            landmark: model.landmark.clone(),
        }
    }
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            brand: model.brand,
            description: model.description,
            category: model.category,
            fragrance_type: model.fragrance_type,
            volume: model.volume,
            price: model.price,
            original_price: model.original_price,
            stock: model.stock,
            ingredients: model.ingredients,
            top_notes: model.top_notes,
            middle_notes: model.middle_notes,
            base_notes: model.base_notes,
            image: model.image,
            rating: model.rating,
            is_featured: model.is_featured,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<reviews::Model> for Review {
    fn from(model: reviews::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            user_id: model.user_id,
            name: model.name,
            rating: model.rating,
            comment: model.comment,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            shipping_address: model.shipping_address,
            payment_method: model.payment_method,
            payment_status: model.payment_status,
            order_status: model.order_status,
            total_amount: model.total_amount,
            transaction_id: model.transaction_id,
            tracking_id: model.tracking_id,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            name: model.name,
            image: model.image,
            price: model.price,
            quantity: model.quantity,
        }
    }
}
