//! Firebase adapters: Authentication and Cloud Firestore over REST.

pub mod codec;
mod credentials;
mod firestore;
mod identity;

pub use credentials::{AccessTokenSource, CredentialsError, ServiceAccount};
pub use firestore::{structured_query, FirestoreDocumentStore};
pub use identity::{auth_code_for, FirebaseIdentityProvider};
