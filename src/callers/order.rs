use super::USER_MANAGEMENT_SERVICE;
use crate::guarded::GuardedClient;
use crate::transport::DependencyRequest;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Order intake errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum OrderError {
    #[error("Invalid order: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Customer not found or not reachable: {0}")]
    CustomerNotFound(String),
}

/// One order line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub sku: String,
    pub quantity: u32,
}

/// Incoming order, before the customer has been confirmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub customer_id: String,
    pub items: Vec<OrderItem>,
}

impl OrderRequest {
    /// Field-presence validation; returns every problem found
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.customer_id.trim().is_empty() {
            errors.push("Customer ID is required".to_string());
        }
        if self.items.is_empty() {
            errors.push("At least one item is required".to_string());
        }
        for item in &self.items {
            if item.sku.trim().is_empty() {
                errors.push("Item SKU is required".to_string());
            }
            if item.quantity == 0 {
                errors.push(format!("Quantity for {} must be > 0", item.sku));
            }
        }
        errors
    }
}

/// Order accepted for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    /// Customer record as returned by the customer service
    pub customer: serde_json::Value,
}

/// Order creation front end. Fails closed: no confirmed customer, no order.
#[derive(Debug, Clone)]
pub struct OrderIntake {
    client: GuardedClient,
}

impl OrderIntake {
    pub fn new(client: GuardedClient) -> Self {
        Self { client }
    }

    /// Validate the order and confirm its customer exists
    pub async fn create_order(&self, request: OrderRequest) -> Result<Order, OrderError> {
        let errors = request.validate();
        if !errors.is_empty() {
            return Err(OrderError::Validation(errors));
        }

        let lookup = DependencyRequest::get("/customer/findcustomerbyid")
            .with_query("customerid", request.customer_id.as_str());

        let customer = match self
            .client
            .call_dependency(USER_MANAGEMENT_SERVICE, &lookup)
            .await
        {
            Some(response) => response.body,
            None => {
                warn!(
                    customer_id = %request.customer_id,
                    "Rejecting order: customer could not be confirmed"
                );
                return Err(OrderError::CustomerNotFound(request.customer_id));
            }
        };

        let order = Order {
            id: Uuid::new_v4(),
            customer_id: request.customer_id,
            items: request.items,
            customer,
        };

        info!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            items = order.items.len(),
            "Order accepted"
        );

        Ok(order)
    }
}
