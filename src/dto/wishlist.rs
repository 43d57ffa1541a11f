use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddWishlistRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct WishlistProducts {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
