use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Address;

fn default_label() -> String {
    "Home".to_string()
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAddressRequest {
    #[serde(default = "default_label")]
    pub label: String,
    pub full_name: String,
    pub phone: String,
    pub pincode: String,
    pub state: String,
    pub city: String,
    pub address_line: String,
    pub landmark: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateAddressRequest {
    pub label: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub pincode: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub address_line: Option<String>,
    pub landmark: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AddressList {
    #[schema(value_type = Vec<Address>)]
    pub items: Vec<Address>,
}
