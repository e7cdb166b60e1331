use serde::{Deserialize, Serialize};

use crate::domain::{Item, ItemId};

/// One page of the windowed listing, as served by `GET /items`.
///
/// `selected` carries the full selection snapshot so a fresh client can
/// hydrate its mirror without a second round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPage {
    pub data: Vec<Item>,
    pub page: u32,
    pub has_more: bool,
    pub selected: Vec<ItemId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortRequest {
    pub sorted: Vec<ItemId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortAccepted {
    pub success: bool,
    pub sorted: Vec<ItemId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectRequest {
    pub selected: Vec<ItemId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectAccepted {
    pub success: bool,
}
