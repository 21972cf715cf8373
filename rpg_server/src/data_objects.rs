use rpg_engine::db_types::OrderId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Into<String>>(message: S) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self { success: false, message: message.into() }
    }
}

/// Request body for the checkout session endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutParams {
    pub order_id: OrderId,
    #[serde(default)]
    pub save_card: bool,
    #[serde(default)]
    pub change_payment_method: bool,
}

/// Query parameters on the post-redirect confirmation route. The processor appends the stored payment method id
/// to the accept url on card-storing sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmQuery {
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// Request body for operator commands that act on a whole order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderParams {
    pub order_id: OrderId,
}

/// Request body for the partial capture and refund commands. The amount is free text, e.g. "150.00" or
/// "1.250,50", and is parsed server side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountParams {
    pub order_id: OrderId,
    pub amount: String,
}
