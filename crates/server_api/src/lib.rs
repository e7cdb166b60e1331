use catalog::{CatalogHandle, DEFAULT_LIMIT, DEFAULT_PAGE};
use serde_json::Value;
use shared::{domain::ItemId, error::ApiError, protocol::ItemPage};
use tracing::debug;

#[derive(Clone)]
pub struct ApiContext {
    pub catalog: CatalogHandle,
}

/// Pagination parameters exactly as they arrived on the query string.
/// Coercion, not rejection, is the contract here: naive clients send
/// garbage and still get page 1.
#[derive(Debug, Default, Clone)]
pub struct RawPageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

pub fn list_items(ctx: &ApiContext, raw: RawPageQuery) -> ItemPage {
    let page = coerce_positive(raw.page.as_deref(), DEFAULT_PAGE);
    let limit = coerce_positive(raw.limit.as_deref(), DEFAULT_LIMIT);
    let filter = raw.search.unwrap_or_default();

    let result = ctx.catalog.query(&filter, page, limit);
    ItemPage {
        data: result.items,
        page,
        has_more: result.has_more,
        selected: ctx.catalog.selection_snapshot(),
    }
}

pub fn replace_order(ctx: &ApiContext, payload: &Value) -> Result<Vec<ItemId>, ApiError> {
    let sorted = id_array(payload.get("sorted"), "sorted")?;
    debug!(len = sorted.len(), "manual order replaced");
    ctx.catalog.replace_order(sorted.clone());
    Ok(sorted)
}

pub fn replace_selection(ctx: &ApiContext, payload: &Value) -> Result<(), ApiError> {
    let selected = id_array(payload.get("selected"), "selected")?;
    debug!(len = selected.len(), "selection replaced");
    ctx.catalog.replace_selection(selected.into_iter().collect());
    Ok(())
}

fn coerce_positive(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value >= 1)
        .unwrap_or(default)
}

/// Sort and select payloads must be arrays of integers; anything else is a
/// validation error and the registers stay untouched.
fn id_array(value: Option<&Value>, field: &str) -> Result<Vec<ItemId>, ApiError> {
    let invalid = || ApiError::validation(format!("{field} must be an array of integers"));

    let Some(Value::Array(entries)) = value else {
        return Err(invalid());
    };
    entries
        .iter()
        .map(|entry| entry.as_i64().map(ItemId).ok_or_else(invalid))
        .collect()
}
