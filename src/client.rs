//! The mock billing client facade.
//!
//! [`SandboxBillingClient`] mirrors the billing service's asynchronous method
//! surface against a local [`BillingStore`] instead of a payment backend.
//! Query and consume work runs sequentially on one background worker thread;
//! purchase-flow results arrive over the broadcast bus and are merged into
//! the store before the purchases-updated listener hears about them.

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{Sender, unbounded};

use crate::broadcast::{BroadcastBus, Intent, ReceiverId};
use crate::flow;
use crate::models::{Purchase, PurchasesResult, SkuDetails, SkuType};
use crate::params::{BillingFlowParams, SkuDetailsParams};
use crate::response::BillingResponse;
use crate::store::BillingStore;

/// Connection lifecycle. `Connecting` is never observable from outside:
/// setup completes synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientState {
    Disconnected,
    #[allow(dead_code)]
    Connecting,
    Connected,
    /// Terminal; a closed client cannot reconnect.
    Closed,
}

/// Receives connection lifecycle callbacks.
///
/// Closures taking a [`BillingResponse`] implement this with a no-op
/// disconnect callback.
pub trait ConnectionListener: Send {
    fn on_billing_setup_finished(&mut self, response: BillingResponse);
    fn on_billing_service_disconnected(&mut self) {}
}

impl<F> ConnectionListener for F
where
    F: FnMut(BillingResponse) + Send,
{
    fn on_billing_setup_finished(&mut self, response: BillingResponse) {
        self(response)
    }
}

/// Callback fired whenever the purchase flow reports a result. A non-OK
/// response carries no purchases.
pub type PurchasesUpdatedListener = dyn Fn(BillingResponse, Option<&[Purchase]>) + Send + Sync;

type Job = Box<dyn FnOnce() + Send>;

/// One background thread draining jobs in submission order.
struct SerialWorker {
    tx: Sender<Job>,
}

impl SerialWorker {
    fn spawn() -> Self {
        let (tx, rx) = unbounded::<Job>();
        thread::spawn(move || {
            for job in rx {
                job();
            }
        });
        Self { tx }
    }

    fn execute(&self, job: impl FnOnce() + Send + 'static) {
        if self.tx.send(Box::new(job)).is_err() {
            log::warn!("billing worker thread is gone; dropping job");
        }
    }
}

struct ClientInner {
    store: BillingStore,
    bus: BroadcastBus,
    state: Mutex<ClientState>,
    connection_listener: Mutex<Option<Box<dyn ConnectionListener>>>,
    purchases_listener: Arc<PurchasesUpdatedListener>,
    receiver: Mutex<Option<ReceiverId>>,
    worker: SerialWorker,
}

impl ClientInner {
    fn notify_purchases_updated(&self, response: BillingResponse, purchases: Option<&[Purchase]>) {
        (self.purchases_listener.as_ref())(response, purchases);
    }

    /// Purchase-result broadcasts land here, on the bus dispatch thread.
    fn on_purchase_result(&self, intent: &Intent) {
        let response = intent
            .int(flow::EXTRA_RESPONSE_CODE)
            .and_then(|code| i32::try_from(code).ok())
            .and_then(BillingResponse::from_code)
            .unwrap_or(BillingResponse::Error);

        if response != BillingResponse::Ok {
            self.notify_purchases_updated(response, None);
            return;
        }

        let purchases = match intent.blob(flow::EXTRA_PURCHASE_BUNDLE) {
            Some(bytes) => {
                match bincode::decode_from_slice::<Vec<Purchase>, _>(
                    bytes,
                    bincode::config::standard(),
                ) {
                    Ok((purchases, _)) => purchases,
                    Err(err) => {
                        log::warn!("malformed purchase bundle: {err}");
                        self.notify_purchases_updated(BillingResponse::Error, None);
                        return;
                    }
                }
            }
            None => Vec::new(),
        };

        for purchase in &purchases {
            if let Err(err) = self.store.add_purchase(purchase.clone()) {
                log::warn!("failed to persist purchase {}: {err}", purchase.purchase_token);
            }
        }
        self.notify_purchases_updated(BillingResponse::Ok, Some(&purchases));
    }
}

/// Drop-in double for the billing service client.
///
/// Handles are cheap to clone and share one connection state, store and
/// worker. See the crate docs for the full flow.
#[derive(Clone)]
pub struct SandboxBillingClient {
    inner: Arc<ClientInner>,
}

impl SandboxBillingClient {
    /// Start building a client. The store and purchases-updated listener are
    /// required; the bus defaults to [`BroadcastBus::local`].
    pub fn builder() -> SandboxBillingClientBuilder {
        SandboxBillingClientBuilder {
            store: None,
            bus: None,
            listener: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.state() == ClientState::Connected
    }

    /// Connect. Completes synchronously: an already-connected client reports
    /// OK with no side effects, a closed client reports a developer error and
    /// never transitions, anything else registers the purchase-result
    /// receiver and reports OK.
    pub fn start_connection(&self, mut listener: impl ConnectionListener + 'static) {
        {
            let mut state = self.state();
            match *state {
                ClientState::Connected => {
                    drop(state);
                    listener.on_billing_setup_finished(BillingResponse::Ok);
                    return;
                }
                ClientState::Closed => {
                    drop(state);
                    log::warn!(
                        "client was already closed and cannot be reused; create another instance"
                    );
                    listener.on_billing_setup_finished(BillingResponse::DeveloperError);
                    return;
                }
                ClientState::Disconnected | ClientState::Connecting => {
                    let handler_inner = Arc::clone(&self.inner);
                    let id = self.inner.bus.register(
                        flow::PURCHASES_UPDATED_ACTION,
                        move |intent| handler_inner.on_purchase_result(intent),
                    );
                    *lock(&self.inner.receiver) = Some(id);
                    *state = ClientState::Connected;
                }
            }
        }
        listener.on_billing_setup_finished(BillingResponse::Ok);
        *lock(&self.inner.connection_listener) = Some(Box::new(listener));
    }

    /// Close the client. The stored connection listener hears
    /// `on_billing_service_disconnected` once; the client is terminal
    /// afterwards.
    pub fn end_connection(&self) {
        if let Some(id) = lock(&self.inner.receiver).take() {
            self.inner.bus.unregister(id);
        }
        let listener = lock(&self.inner.connection_listener).take();
        if let Some(mut listener) = listener {
            listener.on_billing_service_disconnected();
        }
        *self.state() = ClientState::Closed;
    }

    // TODO: back this with per-feature toggles in the store.
    pub fn is_feature_supported(&self, _feature: &str) -> BillingResponse {
        if self.is_ready() {
            BillingResponse::Ok
        } else {
            BillingResponse::ServiceDisconnected
        }
    }

    /// Consume the purchase with this token, reporting on the worker thread.
    ///
    /// Disconnected clients report `ServiceDisconnected`; a blank token is a
    /// developer error; an absent token reports `ItemNotOwned` and leaves the
    /// store untouched.
    pub fn consume_async(
        &self,
        purchase_token: &str,
        listener: impl FnOnce(BillingResponse, String) + Send + 'static,
    ) {
        let token = purchase_token.to_owned();
        if !self.is_ready() {
            listener(BillingResponse::ServiceDisconnected, token);
            return;
        }
        if token.trim().is_empty() {
            listener(BillingResponse::DeveloperError, token);
            return;
        }
        let inner = Arc::clone(&self.inner);
        self.inner.worker.execute(move || {
            let response = match inner.store.purchase_by_token(&token) {
                Ok(Some(purchase)) => {
                    match inner.store.remove_purchase(&purchase.purchase_token) {
                        Ok(_) => BillingResponse::Ok,
                        Err(err) => {
                            log::warn!("failed to remove consumed purchase: {err}");
                            BillingResponse::Error
                        }
                    }
                }
                Ok(None) => BillingResponse::ItemNotOwned,
                Err(err) => {
                    log::warn!("purchase lookup failed: {err}");
                    BillingResponse::Error
                }
            };
            listener(response, token);
        });
    }

    /// Launch the mock purchase flow and return immediately with OK.
    ///
    /// The actual result arrives through the purchases-updated listener once
    /// a [`crate::flow::Storefront`] resolves the prompt.
    pub fn launch_billing_flow(&self, params: &BillingFlowParams) -> BillingResponse {
        self.inner.bus.broadcast(
            Intent::new(flow::PURCHASE_REQUEST_ACTION)
                .with_string(flow::EXTRA_SKU, params.sku.clone())
                .with_string(flow::EXTRA_SKU_TYPE, params.sku_type.clone()),
        );
        BillingResponse::Ok
    }

    /// Look up catalog entries on the worker thread.
    pub fn query_sku_details_async(
        &self,
        params: SkuDetailsParams,
        listener: impl FnOnce(BillingResponse, Option<Vec<SkuDetails>>) + Send + 'static,
    ) {
        if !self.is_ready() {
            listener(BillingResponse::ServiceDisconnected, None);
            return;
        }
        let inner = Arc::clone(&self.inner);
        self.inner.worker.execute(move || {
            match inner.store.sku_details(&params) {
                Ok(details) => listener(BillingResponse::Ok, Some(details)),
                Err(err) => {
                    log::warn!("sku details query failed: {err}");
                    listener(BillingResponse::Error, None);
                }
            }
        });
    }

    /// Report the purchase history for a product class on the worker thread.
    pub fn query_purchase_history_async(
        &self,
        sku_type: &str,
        listener: impl FnOnce(BillingResponse, Option<Vec<Purchase>>) + Send + 'static,
    ) {
        if !self.is_ready() {
            listener(BillingResponse::ServiceDisconnected, None);
            return;
        }
        let client = self.clone();
        let sku_type = sku_type.to_owned();
        self.inner.worker.execute(move || {
            let result = client.query_purchases(&sku_type);
            let purchases = (result.response == BillingResponse::Ok).then_some(result.purchases);
            listener(result.response, purchases);
        });
    }

    /// Synchronously list owned purchases of a product class.
    pub fn query_purchases(&self, sku_type: &str) -> PurchasesResult {
        if !self.is_ready() {
            return PurchasesResult::failure(BillingResponse::ServiceDisconnected);
        }
        let Ok(sku_type) = SkuType::from_str(sku_type) else {
            log::warn!("please provide a valid sku type");
            return PurchasesResult::failure(BillingResponse::DeveloperError);
        };
        match self.inner.store.purchases(sku_type) {
            Ok(result) => result,
            Err(err) => {
                log::warn!("purchase query failed: {err}");
                PurchasesResult::failure(BillingResponse::Error)
            }
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ClientState> {
        lock(&self.inner.state)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Builder mirroring the billing service's client builder.
pub struct SandboxBillingClientBuilder {
    store: Option<BillingStore>,
    bus: Option<BroadcastBus>,
    listener: Option<Arc<PurchasesUpdatedListener>>,
}

impl SandboxBillingClientBuilder {
    pub fn store(mut self, store: BillingStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn bus(mut self, bus: BroadcastBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn on_purchases_updated(
        mut self,
        listener: impl Fn(BillingResponse, Option<&[Purchase]>) + Send + Sync + 'static,
    ) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Build the client. Panics if the store or listener is missing.
    pub fn build(self) -> SandboxBillingClient {
        let store = self.store.expect("store required");
        let listener = self.listener.expect("purchases-updated listener required");
        let bus = self.bus.unwrap_or_else(BroadcastBus::local);
        SandboxBillingClient {
            inner: Arc::new(ClientInner {
                store,
                bus,
                state: Mutex::new(ClientState::Disconnected),
                connection_listener: Mutex::new(None),
                purchases_listener: listener,
                receiver: Mutex::new(None),
                worker: SerialWorker::spawn(),
            }),
        }
    }
}
