//! The debug purchase screen.
//!
//! [`crate::client::SandboxBillingClient::launch_billing_flow`] broadcasts a
//! purchase request; an open [`Storefront`] turns each request into a
//! [`PurchasePrompt`] that test code resolves exactly once. The resolution is
//! published as a purchase-result broadcast, which connected clients merge
//! into their store and forward to their purchases-updated listener.
//!
//! # Examples
//!
//! ```rust,ignore
//! let storefront = Storefront::open_on(bus.clone());
//! client.launch_billing_flow(&params);
//! let prompt = storefront.next_prompt(Duration::from_secs(1)).unwrap();
//! let purchase = prompt.approve().unwrap();
//! ```

use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{Receiver, unbounded};

use crate::broadcast::{BroadcastBus, Intent, ReceiverId};
use crate::error::BillingResult;
use crate::models::{Purchase, SkuType};
use crate::response::BillingResponse;

/// Action carrying a purchase-flow request from the client to the storefront.
pub const PURCHASE_REQUEST_ACTION: &str = "billing_sandbox.purchase_request";
/// Action carrying the flow result back to connected clients.
pub const PURCHASES_UPDATED_ACTION: &str = "billing_sandbox.purchases_updated";

/// String extra: requested sku.
pub const EXTRA_SKU: &str = "request_sku";
/// String extra: requested sku type, in wire form.
pub const EXTRA_SKU_TYPE: &str = "request_sku_type";
/// Integer extra: result code of a completed flow.
pub const EXTRA_RESPONSE_CODE: &str = "response_code";
/// Blob extra: bincode-encoded `Vec<Purchase>` of a successful flow.
pub const EXTRA_PURCHASE_BUNDLE: &str = "response_bundle";

/// Receives purchase-flow requests and queues them as prompts.
///
/// Dropping the storefront unregisters it from the bus; requests broadcast
/// while no storefront is open are lost, like a UI nobody launched.
pub struct Storefront {
    bus: BroadcastBus,
    prompts: Receiver<PurchasePrompt>,
    registration: ReceiverId,
}

impl Storefront {
    /// Open on the process-local bus.
    pub fn open() -> Self {
        Self::open_on(BroadcastBus::local())
    }

    pub fn open_on(bus: BroadcastBus) -> Self {
        let (tx, prompts) = unbounded();
        let registration = bus.register(PURCHASE_REQUEST_ACTION, {
            let bus = bus.clone();
            move |intent| {
                let sku = intent.string(EXTRA_SKU).unwrap_or_default().to_owned();
                let sku_type = intent
                    .string(EXTRA_SKU_TYPE)
                    .and_then(|s| SkuType::from_str(s).ok())
                    .unwrap_or(SkuType::InApp);
                let prompt = PurchasePrompt {
                    sku,
                    sku_type,
                    bus: bus.clone(),
                };
                if tx.send(prompt).is_err() {
                    log::warn!("storefront closed mid-dispatch; dropping purchase request");
                }
            }
        });
        Self {
            bus,
            prompts,
            registration,
        }
    }

    /// Block until the client launches a flow, or give up after `timeout`.
    pub fn next_prompt(&self, timeout: Duration) -> Option<PurchasePrompt> {
        self.prompts.recv_timeout(timeout).ok()
    }
}

impl Drop for Storefront {
    fn drop(&mut self) {
        self.bus.unregister(self.registration);
    }
}

/// A single purchase decision waiting on the debug screen.
///
/// Consumed by whichever of [`approve`](Self::approve),
/// [`approve_with`](Self::approve_with), [`cancel`](Self::cancel) or
/// [`fail`](Self::fail) resolves it.
pub struct PurchasePrompt {
    sku: String,
    sku_type: SkuType,
    bus: BroadcastBus,
}

impl PurchasePrompt {
    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn sku_type(&self) -> SkuType {
        self.sku_type
    }

    /// Approve the purchase: fabricate a purchase record with a fresh token,
    /// publish the OK result carrying it, and hand the record back.
    pub fn approve(self) -> BillingResult<Purchase> {
        let purchase = Purchase {
            order_id: format!("sandbox-order-{}", random_hex(8)?),
            sku: self.sku.clone(),
            sku_type: self.sku_type,
            purchase_token: random_hex(24)?,
            purchase_time: Utc::now().timestamp_millis(),
            developer_payload: String::new(),
        };
        self.approve_with(purchase.clone())?;
        Ok(purchase)
    }

    /// Publish an OK result carrying a caller-built purchase record.
    pub fn approve_with(self, purchase: Purchase) -> BillingResult<()> {
        let bundle = bincode::encode_to_vec(vec![purchase], bincode::config::standard())?;
        self.bus.broadcast(
            Intent::new(PURCHASES_UPDATED_ACTION)
                .with_int(EXTRA_RESPONSE_CODE, i64::from(BillingResponse::Ok.code()))
                .with_blob(EXTRA_PURCHASE_BUNDLE, bundle),
        );
        Ok(())
    }

    /// Walk away from the purchase.
    pub fn cancel(self) {
        self.fail(BillingResponse::UserCanceled);
    }

    /// Publish a non-OK result with the given code and no purchases.
    pub fn fail(self, response: BillingResponse) {
        self.bus.broadcast(
            Intent::new(PURCHASES_UPDATED_ACTION)
                .with_int(EXTRA_RESPONSE_CODE, i64::from(response.code())),
        );
    }
}

fn random_hex(bytes: usize) -> BillingResult<String> {
    let mut buf = vec![0u8; bytes];
    getrandom::getrandom(&mut buf)?;
    Ok(hex::encode(buf))
}
