//! Infrastructure Layer
//!
//! Provider adapters behind the domain ports:
//! - Firebase Authentication and Cloud Firestore (REST)
//! - Stream Chat (REST)
//! - in-process fakes for local runs and tests
//!
//! plus Prometheus metrics.

pub mod firebase;
pub mod memory;
pub mod metrics;
pub mod stream;
pub mod upstream;
