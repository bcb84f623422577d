//! Sample events for existing users.
//!
//! Each user ends up owning at most [`MAX_EVENTS_PER_USER`] events. New
//! events pick a random active category, a template for that category and
//! a venue near the owner's stored location.

use std::collections::HashMap;

use chrono::{DateTime, Days, NaiveTime, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;

use super::categories::active_categories;
use super::{clear_collection, commit_in_batches, SeedError};
use crate::domain::providers::{into_document, DocumentStore, Query, WriteOp};
use crate::domain::{
    Category, Event, EventAddress, EventLocation, GeoPoint, Subcategory, EVENTS_COLLECTION, MAX_EVENTS_PER_USER,
    STRUCTURE_DOC_ID, USERS_COLLECTION,
};

const TEMPLATES_JSON: &str = include_str!("data/event_templates.json");
const FALLBACK_TEMPLATES: &str = "social_community";
const EVENT_TIMEZONE: &str = "Europe/Bucharest";
/// Roughly 5 km of jitter around the owner's location.
const LOCATION_JITTER_DEGREES: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTemplate {
    pub name: String,
    pub description: String,
    pub max_attendees: Option<u32>,
}

/// Templates keyed by category id.
pub fn event_templates() -> Result<HashMap<String, Vec<EventTemplate>>, SeedError> {
    Ok(serde_json::from_str(TEMPLATES_JSON)?)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationAddress {
    pub administrative_area: Option<String>,
    pub country: Option<String>,
    pub locality: Option<String>,
}

/// Location fields the mobile app stores on a profile.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserLocation {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub address: Option<LocationAddress>,
}

/// A user that may receive events.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedUser {
    pub id: String,
    pub display_name: String,
    pub location: Option<UserLocation>,
}

impl SeedUser {
    fn from_document(id: String, data: &serde_json::Map<String, Value>) -> Self {
        let text = |field: &str| data.get(field).and_then(Value::as_str).filter(|s| !s.is_empty());
        let display_name = match (text("firstName"), text("lastName")) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_owned(),
            _ => text("name")
                .or_else(|| text("displayName"))
                .map(str::to_owned)
                .unwrap_or_else(|| format!("User {}", id.chars().take(8).collect::<String>())),
        };
        let location = data
            .get("location")
            .and_then(|l| serde_json::from_value::<UserLocation>(l.clone()).ok());
        Self {
            id,
            display_name,
            location,
        }
    }

    fn samples() -> Vec<Self> {
        [("sample_user_1", "John Doe"), ("sample_user_2", "Jane Smith")]
            .into_iter()
            .map(|(id, name)| Self {
                id: id.to_owned(),
                display_name: name.to_owned(),
                location: None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventSeedReport {
    pub created: Vec<Event>,
    /// `(user, events owned after seeding)`
    pub per_user: Vec<(SeedUser, usize)>,
    pub skipped_users: usize,
}

/// Event venue near `origin`, or in central Bucharest when it is unknown.
pub fn generate_location<R: Rng + ?Sized>(
    origin: Option<&UserLocation>,
    rng: &mut R,
    now: DateTime<Utc>,
) -> EventLocation {
    let Some(origin) = origin else {
        let (lat, lng) = (44.4268, 26.1025);
        return EventLocation {
            address: EventAddress {
                administrative_area: "București".into(),
                country: "Romania".into(),
                full_address: "Centrul Vechi, București, România".into(),
                locality: "București".into(),
                name: "Centrul Vechi".into(),
            },
            geohash: "u8q2w5k9p".into(),
            geopoint: GeoPoint {
                latitude: lat,
                longitude: lng,
            },
            lat,
            lng,
            timestamp: now,
        };
    };

    let lat = origin.lat + (rng.random::<f64>() - 0.5) * LOCATION_JITTER_DEGREES;
    let lng = origin.lng + (rng.random::<f64>() - 0.5) * LOCATION_JITTER_DEGREES;
    let address = origin.address.clone().unwrap_or_default();
    let locality = address.locality.unwrap_or_else(|| "Unknown".into());
    let country = address.country.unwrap_or_else(|| "Romania".into());

    EventLocation {
        address: EventAddress {
            administrative_area: address.administrative_area.unwrap_or_else(|| "Unknown Area".into()),
            full_address: format!("Event Location near {locality}, {country}"),
            country,
            locality,
            name: "Event Venue".into(),
        },
        geohash: "generated_hash".into(),
        geopoint: GeoPoint {
            latitude: lat,
            longitude: lng,
        },
        lat,
        lng,
        timestamp: now,
    }
}

/// 1 to 30 days ahead, on the hour or half hour between 09:00 and 21:30 UTC.
fn future_date<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> DateTime<Utc> {
    let day = now.date_naive() + Days::new(rng.random_range(1..=30));
    let minute = if rng.random_bool(0.5) { 0 } else { 30 };
    let time = NaiveTime::from_hms_opt(rng.random_range(9..=21), minute, 0).unwrap_or_default();
    day.and_time(time).and_utc()
}

fn build_event<R: Rng + ?Sized>(
    user: &SeedUser,
    category: &Category,
    templates: &HashMap<String, Vec<EventTemplate>>,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Option<Event> {
    let subcategory = category
        .subcategories
        .choose(rng)
        .cloned()
        .unwrap_or_else(Subcategory::general);
    let template = templates
        .get(&category.id)
        .or_else(|| templates.get(FALLBACK_TEMPLATES))?
        .choose(rng)?;

    Some(Event {
        event_name: template.name.clone(),
        details: template.description.clone(),
        category_id: category.id.clone(),
        subcategory_id: subcategory.id,
        date_time: future_date(rng, now),
        timezone: EVENT_TIMEZONE.into(),
        status: "active".into(),
        max_attendees: template.max_attendees,
        min_age: rng.random_range(16..=25),
        max_age: rng.random_range(35..=65),
        image_url: String::new(),
        attendees: vec![user.id.clone()],
        user_liked: Vec::new(),
        users_declined: Vec::new(),
        created_by: user.id.clone(),
        requires_approval: rng.random_bool(0.5),
        location: generate_location(user.location.as_ref(), rng, now),
        created_at: now,
        updated_at: now,
    })
}

async fn load_users(store: &dyn DocumentStore) -> Result<Vec<SeedUser>, SeedError> {
    let users: Vec<SeedUser> = store
        .query(&Query::collection(USERS_COLLECTION))
        .await?
        .into_iter()
        .filter(|doc| doc.id != STRUCTURE_DOC_ID)
        .map(|doc| SeedUser::from_document(doc.id, &doc.data))
        .collect();

    if users.is_empty() {
        tracing::warn!("No users found; generating events for sample users");
        return Ok(SeedUser::samples());
    }
    Ok(users)
}

async fn count_user_events(store: &dyn DocumentStore, user_id: &str) -> Result<usize, SeedError> {
    Ok(store
        .query(&Query::collection(EVENTS_COLLECTION).where_eq("createdBy", user_id))
        .await?
        .len())
}

/// Top every user up with one to three new events, never past the per-user cap.
pub async fn seed_events<R: Rng + ?Sized>(
    store: &dyn DocumentStore,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<EventSeedReport, SeedError> {
    let categories = active_categories(store).await?;
    let templates = event_templates()?;
    let users = load_users(store).await?;

    let mut created = Vec::new();
    let mut skipped_users = 0;
    for user in &users {
        let existing = count_user_events(store, &user.id).await?;
        let wanted: usize = rng.random_range(1..=MAX_EVENTS_PER_USER);
        let to_create = MAX_EVENTS_PER_USER.saturating_sub(existing).min(wanted);
        if to_create == 0 {
            tracing::info!(user = %user.display_name, existing, "User already has the maximum events");
            skipped_users += 1;
            continue;
        }

        for _ in 0..to_create {
            let Some(category) = categories.choose(rng) else { break };
            if let Some(event) = build_event(user, category, &templates, rng, now) {
                tracing::debug!(user = %user.id, event = %event.event_name, category = %category.id, "Generated event");
                created.push(event);
            }
        }
    }

    let writes = created
        .iter()
        .map(|event| {
            Ok(WriteOp::Set {
                collection: EVENTS_COLLECTION.to_owned(),
                id: uuid::Uuid::new_v4().simple().to_string(),
                data: into_document(serde_json::to_value(event)?),
                merge: false,
            })
        })
        .collect::<Result<Vec<_>, SeedError>>()?;
    let batches = commit_in_batches(store, writes).await?;
    tracing::info!(created = created.len(), batches, "Events seeded");

    let mut per_user = Vec::with_capacity(users.len());
    for user in users {
        let count = count_user_events(store, &user.id).await?;
        per_user.push((user, count));
    }

    Ok(EventSeedReport {
        created,
        per_user,
        skipped_users,
    })
}

pub async fn cleanup_events(store: &dyn DocumentStore) -> Result<usize, SeedError> {
    let removed = clear_collection(store, EVENTS_COLLECTION).await?;
    tracing::info!(removed, "Events cleaned up");
    Ok(removed)
}
