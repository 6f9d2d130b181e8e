use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog entry a visual match resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: Uuid,
    pub name: String,
    pub unit_price: f64,
    pub description: Option<String>,
    pub image_ref: Option<String>,
}
