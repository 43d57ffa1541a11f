use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub brand: String,
    pub description: Option<String>,
    pub category: String,
    pub fragrance_type: Option<String>,
    pub volume: i32,
    pub price: i64,
    pub original_price: Option<i64>,
    pub stock: i32,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub top_notes: Vec<String>,
    #[serde(default)]
    pub middle_notes: Vec<String>,
    #[serde(default)]
    pub base_notes: Vec<String>,
    pub image: String,
    #[serde(default)]
    pub is_featured: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub fragrance_type: Option<String>,
    pub volume: Option<i32>,
    pub price: Option<i64>,
    pub original_price: Option<i64>,
    pub stock: Option<i32>,
    pub ingredients: Option<Vec<String>>,
    pub top_notes: Option<Vec<String>>,
    pub middle_notes: Option<Vec<String>>,
    pub base_notes: Option<Vec<String>>,
    pub image: Option<String>,
    pub is_featured: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
