use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::bail;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use super::*;

struct FakeGateway {
    items: Vec<Item>,
    server_selected: Vec<ItemId>,
    fail_fetches: AtomicBool,
    fail_submits: bool,
    fetched_pages: Mutex<Vec<(u32, u32, String)>>,
    submitted_orders: Mutex<Vec<Vec<ItemId>>>,
    submitted_selections: Mutex<Vec<Vec<ItemId>>>,
}

impl FakeGateway {
    fn seeded(count: i64) -> Self {
        Self {
            items: (1..=count).map(|i| Item::new(i, format!("Item {i}"))).collect(),
            server_selected: Vec::new(),
            fail_fetches: AtomicBool::new(false),
            fail_submits: false,
            fetched_pages: Mutex::new(Vec::new()),
            submitted_orders: Mutex::new(Vec::new()),
            submitted_selections: Mutex::new(Vec::new()),
        }
    }

    fn with_server_selection(mut self, selected: Vec<ItemId>) -> Self {
        self.server_selected = selected;
        self
    }

    fn failing_submits(mut self) -> Self {
        self.fail_submits = true;
        self
    }
}

#[async_trait]
impl ItemGateway for FakeGateway {
    async fn fetch_page(&self, page: u32, limit: u32, filter: &str) -> Result<ItemPage> {
        self.fetched_pages
            .lock()
            .await
            .push((page, limit, filter.to_string()));
        if self.fail_fetches.load(Ordering::SeqCst) {
            bail!("fetch refused");
        }

        let needle = filter.to_lowercase();
        let rows: Vec<Item> = self
            .items
            .iter()
            .filter(|item| needle.is_empty() || item.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        let start = (page as usize - 1) * limit as usize;
        let end = start + limit as usize;
        let total = rows.len();
        let data = rows.into_iter().skip(start).take(limit as usize).collect();
        Ok(ItemPage {
            data,
            page,
            has_more: end < total,
            selected: self.server_selected.clone(),
        })
    }

    async fn submit_order(&self, order: &[ItemId]) -> Result<()> {
        self.submitted_orders.lock().await.push(order.to_vec());
        if self.fail_submits {
            bail!("order refused");
        }
        Ok(())
    }

    async fn submit_selection(&self, selected: &[ItemId]) -> Result<()> {
        self.submitted_selections
            .lock()
            .await
            .push(selected.to_vec());
        if self.fail_submits {
            bail!("selection refused");
        }
        Ok(())
    }
}

fn rows_viewport(rows: u32) -> Viewport {
    Viewport {
        row_height: 1,
        height: rows,
        lookahead_rows: 2,
    }
}

fn snapshot_ids(snapshot: &ListSnapshot) -> Vec<i64> {
    snapshot.items.iter().map(|item| item.id.0).collect()
}

#[tokio::test]
async fn fill_viewport_requests_pages_until_the_window_is_covered() {
    let gateway = Arc::new(FakeGateway::seeded(100));
    let controller = ListController::new(gateway.clone(), rows_viewport(25), 10);

    controller.fill_viewport().await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.items.len(), 30);
    assert!(snapshot.has_more);
    assert_eq!(
        *gateway.fetched_pages.lock().await,
        vec![
            (1, 10, String::new()),
            (2, 10, String::new()),
            (3, 10, String::new()),
        ]
    );
}

#[tokio::test]
async fn fill_viewport_stops_at_exhaustion() {
    let gateway = Arc::new(FakeGateway::seeded(15));
    let controller = ListController::new(gateway.clone(), rows_viewport(25), 10);

    controller.fill_viewport().await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.items.len(), 15);
    assert!(!snapshot.has_more);

    controller.on_scroll(0).await;
    assert_eq!(gateway.fetched_pages.lock().await.len(), 2);
}

#[tokio::test]
async fn scrolling_near_the_end_requests_the_next_page() {
    let gateway = Arc::new(FakeGateway::seeded(100));
    let controller = ListController::new(gateway.clone(), rows_viewport(25), 10);
    controller.fill_viewport().await;

    // 30 rows materialized; reach is offset + 25 + 2 lookahead rows.
    controller.on_scroll(0).await;
    assert_eq!(controller.snapshot().await.items.len(), 30);

    controller.on_scroll(5).await;
    assert_eq!(controller.snapshot().await.items.len(), 40);
}

#[tokio::test]
async fn filter_change_refetches_from_page_one() {
    let gateway = Arc::new(FakeGateway::seeded(100));
    let controller = ListController::new(gateway.clone(), rows_viewport(25), 10);
    controller.fill_viewport().await;

    controller.set_filter("item 2").await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.filter, "item 2");
    assert!(!snapshot.has_more);
    assert!(snapshot
        .items
        .iter()
        .all(|item| item.name.to_lowercase().contains("item 2")));

    let fetched = gateway.fetched_pages.lock().await;
    let filtered: Vec<&(u32, u32, String)> =
        fetched.iter().filter(|(_, _, f)| f == "item 2").collect();
    assert_eq!(filtered.first().map(|(page, _, _)| *page), Some(1));
}

#[tokio::test]
async fn fetch_failures_are_swallowed_and_retryable() {
    let gateway = Arc::new(FakeGateway::seeded(50));
    gateway.fail_fetches.store(true, Ordering::SeqCst);
    let controller = ListController::new(gateway.clone(), rows_viewport(25), 10);

    controller.fill_viewport().await;
    assert!(controller.snapshot().await.items.is_empty());
    assert_eq!(gateway.fetched_pages.lock().await.len(), 1);

    gateway.fail_fetches.store(false, Ordering::SeqCst);
    controller.fill_viewport().await;
    assert_eq!(controller.snapshot().await.items.len(), 30);
}

#[tokio::test]
async fn reorder_applies_locally_and_submits_the_full_order() {
    let gateway = Arc::new(FakeGateway::seeded(5));
    let controller = ListController::new(gateway.clone(), rows_viewport(10), 5);
    controller.fill_viewport().await;

    let handle = controller
        .reorder(DragMove {
            moved: ItemId(1),
            target: ItemId(3),
        })
        .await
        .expect("materialized drag");
    handle.await.expect("submission task");

    let expected = vec![ItemId(2), ItemId(3), ItemId(1), ItemId(4), ItemId(5)];
    assert_eq!(*gateway.submitted_orders.lock().await, vec![expected]);
    assert_eq!(snapshot_ids(&controller.snapshot().await), vec![2, 3, 1, 4, 5]);
}

#[tokio::test]
async fn failed_order_submission_leaves_the_local_order_standing() {
    let gateway = Arc::new(FakeGateway::seeded(5).failing_submits());
    let controller = ListController::new(gateway.clone(), rows_viewport(10), 5);
    controller.fill_viewport().await;

    let handle = controller
        .reorder(DragMove {
            moved: ItemId(1),
            target: ItemId(3),
        })
        .await
        .expect("materialized drag");
    handle.await.expect("submission task");

    assert_eq!(snapshot_ids(&controller.snapshot().await), vec![2, 3, 1, 4, 5]);
    assert_eq!(gateway.submitted_orders.lock().await.len(), 1);
}

#[tokio::test]
async fn drag_over_unmaterialized_rows_submits_nothing() {
    let gateway = Arc::new(FakeGateway::seeded(5));
    let controller = ListController::new(gateway.clone(), rows_viewport(10), 5);
    controller.fill_viewport().await;

    let handle = controller
        .reorder(DragMove {
            moved: ItemId(9),
            target: ItemId(1),
        })
        .await;
    assert!(handle.is_none());
    assert!(gateway.submitted_orders.lock().await.is_empty());
}

#[tokio::test]
async fn toggles_submit_the_whole_mirror_each_time() {
    let gateway = Arc::new(
        FakeGateway::seeded(10).with_server_selection(vec![ItemId(3)]),
    );
    let controller = ListController::new(gateway.clone(), rows_viewport(10), 10);
    controller.fill_viewport().await;

    assert_eq!(controller.snapshot().await.selected, vec![ItemId(3)]);

    controller.toggle(ItemId(5)).await.await.expect("task");
    controller.toggle(ItemId(3)).await.await.expect("task");

    assert_eq!(
        *gateway.submitted_selections.lock().await,
        vec![vec![ItemId(3), ItemId(5)], vec![ItemId(5)]]
    );
    assert_eq!(controller.snapshot().await.selected, vec![ItemId(5)]);
}

#[derive(Clone, Default)]
struct StubState {
    items_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    sort_bodies: Arc<Mutex<Vec<Value>>>,
    select_bodies: Arc<Mutex<Vec<Value>>>,
}

async fn stub_items(
    State(state): State<StubState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<ItemPage> {
    let page = params
        .get("page")
        .and_then(|value| value.parse().ok())
        .unwrap_or(1);
    state.items_queries.lock().await.push(params);
    Json(ItemPage {
        data: vec![Item::new(1, "Item 1")],
        page,
        has_more: false,
        selected: vec![ItemId(1)],
    })
}

async fn stub_sort(State(state): State<StubState>, Json(body): Json<Value>) -> Json<Value> {
    let sorted = body["sorted"].clone();
    state.sort_bodies.lock().await.push(body);
    Json(json!({ "success": true, "sorted": sorted }))
}

async fn stub_select(State(state): State<StubState>, Json(body): Json<Value>) -> Json<Value> {
    state.select_bodies.lock().await.push(body);
    Json(json!({ "success": true }))
}

async fn spawn_stub() -> (StubState, String) {
    let state = StubState::default();
    let app = Router::new()
        .route("/items", get(stub_items))
        .route("/sort", post(stub_sort))
        .route("/select", post(stub_select))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (state, format!("http://{addr}"))
}

#[tokio::test]
async fn http_gateway_requests_pages_with_query_parameters() {
    let (state, url) = spawn_stub().await;
    let gateway = HttpItemGateway::new(&url).expect("gateway");

    let page = gateway.fetch_page(3, 10, "abc").await.expect("page");
    assert_eq!(page.page, 3);
    assert_eq!(page.selected, vec![ItemId(1)]);

    let queries = state.items_queries.lock().await;
    assert_eq!(queries[0].get("page").map(String::as_str), Some("3"));
    assert_eq!(queries[0].get("limit").map(String::as_str), Some("10"));
    assert_eq!(queries[0].get("search").map(String::as_str), Some("abc"));
}

#[tokio::test]
async fn http_gateway_posts_the_sorted_ids() {
    let (state, url) = spawn_stub().await;
    let gateway = HttpItemGateway::new(&url).expect("gateway");

    gateway
        .submit_order(&[ItemId(5), ItemId(1)])
        .await
        .expect("submit");

    let bodies = state.sort_bodies.lock().await;
    assert_eq!(bodies[0], json!({ "sorted": [5, 1] }));
}

#[tokio::test]
async fn http_gateway_posts_the_selection_snapshot() {
    let (state, url) = spawn_stub().await;
    let gateway = HttpItemGateway::new(&url).expect("gateway");

    gateway
        .submit_selection(&[ItemId(2), ItemId(7)])
        .await
        .expect("submit");

    let bodies = state.select_bodies.lock().await;
    assert_eq!(bodies[0], json!({ "selected": [2, 7] }));
}
