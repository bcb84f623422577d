//! Event category taxonomy stored in the `categories` collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CATEGORIES_COLLECTION: &str = "categories";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Subcategory {
    /// Used for categories that define no subcategories.
    pub fn general() -> Self {
        Self {
            id: "general".into(),
            name: "General".into(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub subcategories: Vec<Subcategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Category {
    pub fn subcategory(&self, id: &str) -> Option<&Subcategory> {
        self.subcategories.iter().find(|s| s.id == id)
    }
}
