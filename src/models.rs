//! Record types persisted by [`crate::store::BillingStore`] and the result
//! shapes handed to listeners.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use typed_builder::TypedBuilder;

use crate::response::BillingResponse;

/// Product classes understood by the billing surface.
///
/// The wire form is the lowercase string the billing service uses
/// (`"inapp"`, `"subs"`); entry points that take the string form parse it
/// with [`std::str::FromStr`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Encode,
    Decode,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
pub enum SkuType {
    /// One-time product, consumable after purchase.
    #[strum(serialize = "inapp")]
    #[serde(rename = "inapp")]
    InApp,
    /// Recurring subscription.
    #[strum(serialize = "subs")]
    #[serde(rename = "subs")]
    Subs,
}

/// Catalog entry for a purchasable product.
#[derive(
    Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize, TypedBuilder,
)]
#[builder(doc, field_defaults(setter(into)))]
pub struct SkuDetails {
    /// Product identifier, unique within a store.
    pub sku: String,
    pub sku_type: SkuType,
    /// Display price, already formatted ("$3.99").
    pub price: String,
    #[builder(default)]
    pub title: String,
    #[builder(default)]
    pub description: String,
}

/// A completed purchase, keyed by its token.
#[derive(
    Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize, TypedBuilder,
)]
#[builder(doc, field_defaults(setter(into)))]
pub struct Purchase {
    pub order_id: String,
    pub sku: String,
    pub sku_type: SkuType,
    /// Unique token identifying this transaction.
    pub purchase_token: String,
    /// Epoch milliseconds, the unit the billing service reports.
    pub purchase_time: i64,
    /// Opaque receipt metadata supplied by the application.
    #[builder(default)]
    pub developer_payload: String,
}

/// Response code plus purchase list, the shape synchronous purchase queries
/// return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasesResult {
    pub response: BillingResponse,
    pub purchases: Vec<Purchase>,
}

impl PurchasesResult {
    pub fn new(response: BillingResponse, purchases: Vec<Purchase>) -> Self {
        Self {
            response,
            purchases,
        }
    }

    pub fn ok(purchases: Vec<Purchase>) -> Self {
        Self::new(BillingResponse::Ok, purchases)
    }

    /// A failure result carries no purchases.
    pub fn failure(response: BillingResponse) -> Self {
        Self::new(response, Vec::new())
    }
}
