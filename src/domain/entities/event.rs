//! Sample events stored in the `users_events` collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const EVENTS_COLLECTION: &str = "users_events";

/// Events a single user may own through seeding.
pub const MAX_EVENTS_PER_USER: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAddress {
    pub administrative_area: String,
    pub country: String,
    pub full_address: String,
    pub locality: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLocation {
    pub address: EventAddress,
    pub geohash: String,
    pub geopoint: GeoPoint,
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_name: String,
    pub details: String,
    pub category_id: String,
    pub subcategory_id: String,
    pub date_time: DateTime<Utc>,
    pub timezone: String,
    pub status: String,
    pub max_attendees: Option<u32>,
    pub min_age: u32,
    pub max_age: u32,
    pub image_url: String,
    pub attendees: Vec<String>,
    #[serde(rename = "user_liked")]
    pub user_liked: Vec<String>,
    #[serde(rename = "users_declined")]
    pub users_declined: Vec<String>,
    pub created_by: String,
    pub requires_approval: bool,
    pub location: EventLocation,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
