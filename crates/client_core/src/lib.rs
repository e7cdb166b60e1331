use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{Item, ItemId},
    protocol::{ItemPage, SelectAccepted, SelectRequest, SortAccepted, SortRequest},
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::warn;
use url::Url;

mod view;

pub use view::{DragMove, FetchPhase, FetchTicket, ListView, Viewport};

/// Transport seam between the client state machine and the item service.
/// Swapped for an in-process fake in tests.
#[async_trait]
pub trait ItemGateway: Send + Sync {
    async fn fetch_page(&self, page: u32, limit: u32, filter: &str) -> Result<ItemPage>;
    async fn submit_order(&self, order: &[ItemId]) -> Result<()>;
    async fn submit_selection(&self, selected: &[ItemId]) -> Result<()>;
}

pub struct HttpItemGateway {
    http: Client,
    base: Url,
}

impl HttpItemGateway {
    pub fn new(server_url: &str) -> Result<Self> {
        let base = Url::parse(server_url).context("invalid server url")?;
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("invalid endpoint path '{path}'"))
    }
}

#[async_trait]
impl ItemGateway for HttpItemGateway {
    async fn fetch_page(&self, page: u32, limit: u32, filter: &str) -> Result<ItemPage> {
        let response = self
            .http
            .get(self.endpoint("items")?)
            .query(&[
                ("page", page.to_string()),
                ("limit", limit.to_string()),
                ("search", filter.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn submit_order(&self, order: &[ItemId]) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint("sort")?)
            .json(&SortRequest {
                sorted: order.to_vec(),
            })
            .send()
            .await?
            .error_for_status()?;
        let accepted: SortAccepted = response.json().await?;
        ensure!(accepted.success, "server refused the new order");
        Ok(())
    }

    async fn submit_selection(&self, selected: &[ItemId]) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint("select")?)
            .json(&SelectRequest {
                selected: selected.to_vec(),
            })
            .send()
            .await?
            .error_for_status()?;
        let accepted: SelectAccepted = response.json().await?;
        ensure!(accepted.success, "server refused the selection");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ListSnapshot {
    pub items: Vec<Item>,
    pub has_more: bool,
    pub filter: String,
    pub selected: Vec<ItemId>,
}

/// Async driver around [`ListView`]: runs the fetch cycle against an
/// [`ItemGateway`] and turns user gestures into optimistic local mutations
/// plus fire-and-forget writes. Write failures are logged and otherwise
/// swallowed; the local state stands uncorrected.
pub struct ListController {
    gateway: Arc<dyn ItemGateway>,
    viewport: Viewport,
    page_limit: u32,
    view: Mutex<ListView>,
}

impl ListController {
    pub fn new(gateway: Arc<dyn ItemGateway>, viewport: Viewport, page_limit: u32) -> Self {
        Self {
            gateway,
            viewport,
            page_limit,
            view: Mutex::new(ListView::new()),
        }
    }

    pub async fn snapshot(&self) -> ListSnapshot {
        let view = self.view.lock().await;
        ListSnapshot {
            items: view.items().to_vec(),
            has_more: view.has_more(),
            filter: view.filter().to_string(),
            selected: view.selection_snapshot(),
        }
    }

    pub async fn set_filter(&self, filter: &str) {
        self.view.lock().await.set_filter(filter);
        self.fill_viewport().await;
    }

    /// Requests pages until the viewport is covered or the sequence is
    /// exhausted. Called after session start and after every filter reset.
    pub async fn fill_viewport(&self) {
        loop {
            {
                let view = self.view.lock().await;
                if !view.can_fetch() || !self.viewport.wants_fill(view.len()) {
                    break;
                }
            }
            if !self.fetch_step().await {
                break;
            }
        }
    }

    /// Scroll-offset trigger from the rendering layer: request the next
    /// page once the window is within the lookahead buffer of the end.
    pub async fn on_scroll(&self, scroll_offset: u32) {
        let should_fetch = {
            let view = self.view.lock().await;
            view.can_fetch() && self.viewport.near_end(scroll_offset, view.len())
        };
        if should_fetch {
            self.fetch_step().await;
        }
    }

    async fn fetch_step(&self) -> bool {
        let ticket = self.view.lock().await.begin_fetch();
        let Some(ticket) = ticket else {
            return false;
        };
        match self
            .gateway
            .fetch_page(ticket.page, self.page_limit, &ticket.filter)
            .await
        {
            Ok(page) => {
                self.view.lock().await.absorb_page(&ticket, page);
                true
            }
            Err(error) => {
                warn!(%error, page = ticket.page, "page fetch failed");
                self.view.lock().await.abort_fetch(&ticket);
                false
            }
        }
    }

    /// Applies a drag locally, then submits the full new order in the
    /// background. Returns the submission task, or `None` when the gesture
    /// referenced rows that are not materialized.
    pub async fn reorder(&self, drag: DragMove) -> Option<JoinHandle<()>> {
        let order = self.view.lock().await.apply_drag(drag)?;
        let gateway = Arc::clone(&self.gateway);
        Some(tokio::spawn(async move {
            if let Err(error) = gateway.submit_order(&order).await {
                warn!(%error, "order submission failed");
            }
        }))
    }

    /// Flips selection membership locally, then submits the full mirror in
    /// the background.
    pub async fn toggle(&self, id: ItemId) -> JoinHandle<()> {
        let selected = self.view.lock().await.toggle_selection(id);
        let gateway = Arc::clone(&self.gateway);
        tokio::spawn(async move {
            if let Err(error) = gateway.submit_selection(&selected).await {
                warn!(%error, "selection submission failed");
            }
        })
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
