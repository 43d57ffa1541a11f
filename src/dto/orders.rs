use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::orders::ShippingAddress,
    models::{Order, OrderItem},
    status::PaymentMethod,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub payment_method: Option<PaymentMethod>,
    /// Inline address; wins over `address_id`.
    pub shipping_address: Option<ShippingAddress>,
    /// One of the caller's saved addresses.
    pub address_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
    pub tracking_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentRequest {
    pub payment_status: String,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
