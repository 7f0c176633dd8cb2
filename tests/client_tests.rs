use std::time::Duration;

use billing_sandbox::broadcast::BroadcastBus;
use billing_sandbox::client::{ConnectionListener, SandboxBillingClient};
use billing_sandbox::models::{Purchase, SkuDetails, SkuType};
use billing_sandbox::params::SkuDetailsParams;
use billing_sandbox::response::BillingResponse;
use billing_sandbox::store::BillingStore;
use crossbeam_channel::{Receiver, Sender, unbounded};

const TIMEOUT: Duration = Duration::from_secs(2);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

type UpdateEvent = (BillingResponse, Option<Vec<Purchase>>);

fn client_with(
    store: &BillingStore,
    bus: &BroadcastBus,
) -> (SandboxBillingClient, Receiver<UpdateEvent>) {
    let (tx, rx) = unbounded();
    let client = SandboxBillingClient::builder()
        .store(store.clone())
        .bus(bus.clone())
        .on_purchases_updated(move |response, purchases| {
            tx.send((response, purchases.map(<[Purchase]>::to_vec)))
                .unwrap();
        })
        .build();
    (client, rx)
}

fn connect(client: &SandboxBillingClient) -> BillingResponse {
    let (tx, rx) = unbounded();
    client.start_connection(move |response| tx.send(response).unwrap());
    rx.recv_timeout(TIMEOUT).unwrap()
}

fn purchase(token: &str, sku: &str, sku_type: SkuType) -> Purchase {
    Purchase::builder()
        .order_id(format!("order-{token}"))
        .sku(sku)
        .sku_type(sku_type)
        .purchase_token(token)
        .purchase_time(1_700_000_000_000i64)
        .build()
}

#[test]
fn test_connection_reports_ok() {
    init_logging();
    let store = BillingStore::temp().unwrap();
    let (client, _updates) = client_with(&store, &BroadcastBus::new());

    assert!(!client.is_ready());
    assert_eq!(connect(&client), BillingResponse::Ok);
    assert!(client.is_ready());
}

#[test]
fn test_reconnecting_while_connected_is_idempotent() {
    let store = BillingStore::temp().unwrap();
    let (client, updates) = client_with(&store, &BroadcastBus::new());

    assert_eq!(connect(&client), BillingResponse::Ok);
    assert_eq!(connect(&client), BillingResponse::Ok);
    assert!(client.is_ready());
    // No side effects: nothing reached the purchases-updated listener.
    assert!(updates.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn test_connecting_after_close_reports_developer_error() {
    let store = BillingStore::temp().unwrap();
    let (client, _updates) = client_with(&store, &BroadcastBus::new());

    assert_eq!(connect(&client), BillingResponse::Ok);
    client.end_connection();

    assert_eq!(connect(&client), BillingResponse::DeveloperError);
    assert!(!client.is_ready());
    // Still closed: repeated attempts never transition.
    assert_eq!(connect(&client), BillingResponse::DeveloperError);
}

struct TrackingListener {
    setup: Sender<BillingResponse>,
    lost: Sender<()>,
}

impl ConnectionListener for TrackingListener {
    fn on_billing_setup_finished(&mut self, response: BillingResponse) {
        self.setup.send(response).unwrap();
    }

    fn on_billing_service_disconnected(&mut self) {
        self.lost.send(()).unwrap();
    }
}

#[test]
fn test_end_connection_signals_disconnect() {
    let store = BillingStore::temp().unwrap();
    let (client, _updates) = client_with(&store, &BroadcastBus::new());

    let (setup_tx, setup_rx) = unbounded();
    let (lost_tx, lost_rx) = unbounded();
    client.start_connection(TrackingListener {
        setup: setup_tx,
        lost: lost_tx,
    });
    assert_eq!(setup_rx.recv_timeout(TIMEOUT).unwrap(), BillingResponse::Ok);

    client.end_connection();
    assert!(lost_rx.recv_timeout(TIMEOUT).is_ok());
    assert!(!client.is_ready());
}

#[test]
fn test_query_purchases_disconnected() {
    let store = BillingStore::temp().unwrap();
    store
        .add_purchase(purchase("tok-1", "premium", SkuType::InApp))
        .unwrap();
    let (client, _updates) = client_with(&store, &BroadcastBus::new());

    // Store contents are irrelevant while disconnected.
    let result = client.query_purchases("inapp");
    assert_eq!(result.response, BillingResponse::ServiceDisconnected);
    assert!(result.purchases.is_empty());
}

#[test]
fn test_query_purchases_invalid_sku_type() {
    let store = BillingStore::temp().unwrap();
    let (client, _updates) = client_with(&store, &BroadcastBus::new());
    connect(&client);

    assert_eq!(
        client.query_purchases("").response,
        BillingResponse::DeveloperError
    );
    assert_eq!(
        client.query_purchases("firmware").response,
        BillingResponse::DeveloperError
    );
}

#[test]
fn test_query_purchases_filters_by_type() {
    let store = BillingStore::temp().unwrap();
    store
        .add_purchase(purchase("tok-1", "premium", SkuType::InApp))
        .unwrap()
        .add_purchase(purchase("tok-2", "monthly", SkuType::Subs))
        .unwrap();
    let (client, _updates) = client_with(&store, &BroadcastBus::new());
    connect(&client);

    let result = client.query_purchases("subs");
    assert_eq!(result.response, BillingResponse::Ok);
    assert_eq!(result.purchases.len(), 1);
    assert_eq!(result.purchases[0].purchase_token, "tok-2");
}

#[test]
fn test_query_sku_details_disconnected() {
    let store = BillingStore::temp().unwrap();
    let (client, _updates) = client_with(&store, &BroadcastBus::new());

    let (tx, rx) = unbounded();
    let params = SkuDetailsParams::builder().sku_type("inapp").build();
    client.query_sku_details_async(params, move |response, details| {
        tx.send((response, details)).unwrap();
    });
    let (response, details) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(response, BillingResponse::ServiceDisconnected);
    assert!(details.is_none());
}

#[test]
fn test_query_sku_details_returns_matches() {
    let store = BillingStore::temp().unwrap();
    store
        .add_product(
            SkuDetails::builder()
                .sku("premium")
                .sku_type(SkuType::InApp)
                .price("$3.99")
                .build(),
        )
        .unwrap()
        .add_product(
            SkuDetails::builder()
                .sku("coins")
                .sku_type(SkuType::InApp)
                .price("$0.99")
                .build(),
        )
        .unwrap();
    let (client, _updates) = client_with(&store, &BroadcastBus::new());
    connect(&client);

    let (tx, rx) = unbounded();
    let params = SkuDetailsParams::builder()
        .sku_type("inapp")
        .skus(vec!["premium".to_string()])
        .build();
    client.query_sku_details_async(params, move |response, details| {
        tx.send((response, details)).unwrap();
    });
    let (response, details) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(response, BillingResponse::Ok);
    let details = details.unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].sku, "premium");
}

#[test]
fn test_query_purchase_history() {
    let store = BillingStore::temp().unwrap();
    store
        .add_purchase(purchase("tok-1", "premium", SkuType::InApp))
        .unwrap();
    let (client, _updates) = client_with(&store, &BroadcastBus::new());

    let (tx, rx) = unbounded();
    client.query_purchase_history_async("inapp", move |response, purchases| {
        tx.send((response, purchases)).unwrap();
    });
    let (response, purchases) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(response, BillingResponse::ServiceDisconnected);
    assert!(purchases.is_none());

    connect(&client);
    let (tx, rx) = unbounded();
    client.query_purchase_history_async("inapp", move |response, purchases| {
        tx.send((response, purchases)).unwrap();
    });
    let (response, purchases) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(response, BillingResponse::Ok);
    assert_eq!(purchases.unwrap().len(), 1);
}

#[test]
fn test_consume_absent_token_reports_item_not_owned() {
    let store = BillingStore::temp().unwrap();
    store
        .add_purchase(purchase("tok-1", "premium", SkuType::InApp))
        .unwrap();
    let (client, _updates) = client_with(&store, &BroadcastBus::new());
    connect(&client);

    let (tx, rx) = unbounded();
    client.consume_async("tok-unknown", move |response, token| {
        tx.send((response, token)).unwrap();
    });
    let (response, token) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(response, BillingResponse::ItemNotOwned);
    assert_eq!(token, "tok-unknown");
    // Store unchanged.
    assert!(store.purchase_by_token("tok-1").unwrap().is_some());
}

#[test]
fn test_consume_removes_exactly_that_purchase() {
    let store = BillingStore::temp().unwrap();
    store
        .add_purchase(purchase("tok-1", "premium", SkuType::InApp))
        .unwrap()
        .add_purchase(purchase("tok-2", "coins", SkuType::InApp))
        .unwrap();
    let (client, _updates) = client_with(&store, &BroadcastBus::new());
    connect(&client);

    let (tx, rx) = unbounded();
    client.consume_async("tok-1", move |response, token| {
        tx.send((response, token)).unwrap();
    });
    let (response, token) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(response, BillingResponse::Ok);
    assert_eq!(token, "tok-1");
    assert!(store.purchase_by_token("tok-1").unwrap().is_none());
    assert!(store.purchase_by_token("tok-2").unwrap().is_some());
}

#[test]
fn test_consume_blank_token_is_developer_error() {
    let store = BillingStore::temp().unwrap();
    let (client, _updates) = client_with(&store, &BroadcastBus::new());
    connect(&client);

    let (tx, rx) = unbounded();
    client.consume_async("  ", move |response, _token| {
        tx.send(response).unwrap();
    });
    assert_eq!(
        rx.recv_timeout(TIMEOUT).unwrap(),
        BillingResponse::DeveloperError
    );
}

#[test]
fn test_consume_disconnected() {
    let store = BillingStore::temp().unwrap();
    store
        .add_purchase(purchase("tok-1", "premium", SkuType::InApp))
        .unwrap();
    let (client, _updates) = client_with(&store, &BroadcastBus::new());

    let (tx, rx) = unbounded();
    client.consume_async("tok-1", move |response, _token| {
        tx.send(response).unwrap();
    });
    assert_eq!(
        rx.recv_timeout(TIMEOUT).unwrap(),
        BillingResponse::ServiceDisconnected
    );
    assert!(store.purchase_by_token("tok-1").unwrap().is_some());
}

#[test]
fn test_feature_support_requires_connection() {
    let store = BillingStore::temp().unwrap();
    let (client, _updates) = client_with(&store, &BroadcastBus::new());

    assert_eq!(
        client.is_feature_supported("subscriptions"),
        BillingResponse::ServiceDisconnected
    );
    connect(&client);
    assert_eq!(
        client.is_feature_supported("subscriptions"),
        BillingResponse::Ok
    );
}
