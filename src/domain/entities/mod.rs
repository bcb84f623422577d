//! # Domain Entities
//!
//! Documents persisted in the document store. Field names follow the mobile
//! app's camelCase conventions.
//!
//! - **UserProfile**: `users/{uid}`
//! - **ChannelRecord**: `channels/{id}`, mirrored at the chat provider
//! - **Category**: `categories/{id}` event taxonomy
//! - **Event**: `users_events/{id}` seeded sample events

mod category;
mod channel;
mod event;
mod user;

pub use category::{Category, Subcategory, CATEGORIES_COLLECTION};
pub use channel::{merge_members, ChannelRecord, ChannelSettings, ChannelType, CHANNELS_COLLECTION};
pub use event::{
    Event, EventAddress, EventLocation, GeoPoint, EVENTS_COLLECTION, MAX_EVENTS_PER_USER,
};
pub use user::{search_name, UserProfile, UserRole, USERS_COLLECTION};

pub const CONVERSATIONS_COLLECTION: &str = "conversations";
pub const STATS_COLLECTION: &str = "stats";

/// Id of the schema marker document kept in each collection.
pub const STRUCTURE_DOC_ID: &str = "_structure";
