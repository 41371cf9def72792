// Cart wire types
// Everything here is server-computed and trusted as returned

use serde::{Deserialize, Serialize};

/// One line of the server-held cart.
///
/// Product fields come from a left join and are `null` when the product
/// row no longer exists; the line itself is still valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: u64,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_description: Option<String>,
    #[serde(default)]
    pub product_image_url: Option<String>,
    #[serde(default)]
    pub product_price: Option<f64>,
    #[serde(default)]
    pub product_stock: Option<u32>,
    pub quantity: u32,
    #[serde(default)]
    pub total_price: Option<f64>,
}

impl CartItem {
    /// Whether the product behind this line has been deleted
    pub fn is_orphaned(&self) -> bool {
        self.product_name.is_none() && self.product_price.is_none()
    }
}

/// Aggregate over the cart, fetched separately from the item list
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub total_items: u32,
    pub total_quantity: u64,
    pub total_amount: f64,
}

impl CartSummary {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Settlement returned by checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    #[serde(default = "default_success")]
    pub success: bool,
    pub message: String,
    pub total_amount: f64,
    pub remaining_balance: f64,
}

fn default_success() -> bool {
    true
}

/// Body of a cart mutation response: the touched line for add/update,
/// an acknowledgement for remove/clear
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MutationResult {
    Item(CartItem),
    Ack { message: String },
}

impl MutationResult {
    pub fn message(&self) -> Option<&str> {
        match self {
            MutationResult::Ack { message } => Some(message),
            MutationResult::Item(_) => None,
        }
    }
}

/// Request body for add and update
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CartLine {
    pub product_id: u64,
    pub quantity: u32,
}
