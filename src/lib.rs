//! # OVO Chat Backend Library
//!
//! Backend for the OVO Meet app. It keeps three providers in step:
//! - Firebase Authentication (identity, ID tokens)
//! - Cloud Firestore (profiles, channel records, categories, events)
//! - Stream Chat (channels, messages, presence)
//!
//! ## Architecture
//!
//! - **Domain Layer**: entities, identifiers and the provider ports
//! - **Application Layer**: user, chat and internal-auth services plus DTOs
//! - **Infrastructure Layer**: REST adapters for each provider, in-process fakes, metrics
//! - **Presentation Layer**: HTTP routes, extractors and middleware
//!
//! ## Module Structure
//!
//! ```text
//! ovo_chat_backend/
//! +-- config/         Layered settings
//! +-- domain/         Entities, channel ids, provider ports
//! +-- application/    Services and DTOs
//! +-- infrastructure/ Firebase, Firestore, Stream Chat, memory fakes
//! +-- platform/       Mobile configuration bridge
//! +-- presentation/   HTTP routes and middleware
//! +-- seeding/        Reference data used by ovo-admin
//! +-- shared/         Errors, response envelope, validation
//! ```

pub mod config;

pub mod domain;

pub mod application;

pub mod infrastructure;

pub mod platform;

pub mod presentation;

pub mod seeding;

pub mod shared;

pub mod startup;

pub mod telemetry;
