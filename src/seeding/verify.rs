//! Seeded data overview.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use super::SeedError;
use crate::domain::providers::{DocumentStore, Query};
use crate::domain::{CATEGORIES_COLLECTION, EVENTS_COLLECTION, STRUCTURE_DOC_ID, USERS_COLLECTION};

const SAMPLE_EVENTS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct EventSample {
    pub name: String,
    pub category: String,
    pub date_time: String,
    pub created_by: String,
    pub max_attendees: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeedOverview {
    pub users: usize,
    pub events: usize,
    pub categories: usize,
    /// Owner display name (or uid) to event count
    pub events_per_user: BTreeMap<String, usize>,
    pub events_per_category: BTreeMap<String, usize>,
    pub samples: Vec<EventSample>,
}

fn text<'a>(data: &'a serde_json::Map<String, Value>, field: &str) -> Option<&'a str> {
    data.get(field).and_then(Value::as_str)
}

/// Count users, events and categories and break events down by owner and category.
pub async fn overview(store: &dyn DocumentStore) -> Result<SeedOverview, SeedError> {
    let users = store.query(&Query::collection(USERS_COLLECTION)).await?;
    let events = store.query(&Query::collection(EVENTS_COLLECTION)).await?;
    let categories = store.query(&Query::collection(CATEGORIES_COLLECTION)).await?;

    let names: HashMap<&str, String> = users
        .iter()
        .filter(|doc| doc.id != STRUCTURE_DOC_ID)
        .map(|doc| {
            let name = match (text(&doc.data, "firstName"), text(&doc.data, "lastName")) {
                (Some(first), Some(last)) => format!("{first} {last}"),
                _ => text(&doc.data, "name").unwrap_or(&doc.id).to_owned(),
            };
            (doc.id.as_str(), name)
        })
        .collect();
    let owner = |uid: &str| names.get(uid).cloned().unwrap_or_else(|| uid.to_owned());

    let mut report = SeedOverview {
        users: names.len(),
        events: events.len(),
        categories: categories.len(),
        ..Default::default()
    };

    for event in &events {
        let created_by = text(&event.data, "createdBy").unwrap_or("unknown");
        *report.events_per_user.entry(owner(created_by)).or_default() += 1;
        let category = text(&event.data, "categoryId").unwrap_or("unknown");
        *report.events_per_category.entry(category.to_owned()).or_default() += 1;
    }

    report.samples = events
        .iter()
        .take(SAMPLE_EVENTS)
        .map(|event| EventSample {
            name: text(&event.data, "eventName").unwrap_or_default().to_owned(),
            category: format!(
                "{}/{}",
                text(&event.data, "categoryId").unwrap_or_default(),
                text(&event.data, "subcategoryId").unwrap_or_default()
            ),
            date_time: text(&event.data, "dateTime").unwrap_or_default().to_owned(),
            created_by: owner(text(&event.data, "createdBy").unwrap_or_default()),
            max_attendees: event.data.get("maxAttendees").and_then(Value::as_u64),
        })
        .collect();

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::providers::into_document;
    use crate::infrastructure::memory::MemoryDocumentStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn empty_store_reports_zeroes() {
        let store = MemoryDocumentStore::new();
        assert_eq!(overview(&store).await.unwrap(), SeedOverview::default());
    }

    #[tokio::test]
    async fn events_are_grouped_by_owner_and_category() {
        let store = MemoryDocumentStore::new();
        store
            .set(
                USERS_COLLECTION,
                "u1",
                into_document(json!({"firstName": "Ana", "lastName": "Pop"})),
                false,
            )
            .await
            .unwrap();
        for (id, category) in [("e1", "sports"), ("e2", "sports"), ("e3", "food_drink")] {
            store
                .set(
                    EVENTS_COLLECTION,
                    id,
                    into_document(json!({
                        "eventName": "Meetup",
                        "categoryId": category,
                        "subcategoryId": "general",
                        "createdBy": "u1",
                        "maxAttendees": null
                    })),
                    false,
                )
                .await
                .unwrap();
        }

        let report = overview(&store).await.unwrap();

        assert_eq!(report.users, 1);
        assert_eq!(report.events, 3);
        assert_eq!(report.events_per_user.get("Ana Pop"), Some(&3));
        assert_eq!(report.events_per_category.get("sports"), Some(&2));
        assert_eq!(report.samples.len(), 3);
        assert_eq!(report.samples[0].max_attendees, None);
        assert_eq!(report.samples[0].category, "sports/general");
    }
}
