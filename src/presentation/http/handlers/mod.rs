//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints, plus the mapping from service
//! errors to API errors. Failures the provider answered (a status from
//! Stream, Firestore or Firebase) keep the provider's code; anything else is
//! reported under the route's own code.

pub mod auth;
pub mod channel;
pub mod chat;
pub mod config;
pub mod health;
pub mod user;

use crate::application::services::{ChatError, UserError};
use crate::domain::providers::{ChatProviderError, DocumentStoreError};
use crate::shared::error::AppError;

/// Route-specific fallback for unclassified failures.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Failure {
    pub code: &'static str,
    pub message: &'static str,
}

impl Failure {
    pub const fn new(code: &'static str, message: &'static str) -> Self {
        Self { code, message }
    }

    fn internal(self, err: impl ToString) -> AppError {
        AppError::internal(self.code, self.message, err)
    }

    fn store(self, err: DocumentStoreError) -> AppError {
        match err {
            DocumentStoreError::InvalidId(path) => {
                AppError::bad_request("INVALID_INPUT", format!("Invalid identifier in {path}"))
            }
            err @ DocumentStoreError::Provider { .. } => err.into(),
            err => self.internal(err),
        }
    }

    fn chat(self, err: ChatProviderError) -> AppError {
        match err {
            err @ (ChatProviderError::Api { .. } | ChatProviderError::NotFound(_)) => err.into(),
            err => self.internal(err),
        }
    }

    pub fn user(self, err: UserError) -> AppError {
        match err {
            UserError::NotFound(message) => AppError::not_found("USER_NOT_FOUND", message),
            UserError::Invalid(message) => AppError::bad_request("INVALID_INPUT", message),
            UserError::Identity(err) => err.into(),
            UserError::Store(err) => self.store(err),
            UserError::Chat(err) => self.chat(err),
        }
    }

    pub fn channel(self, err: ChatError) -> AppError {
        match err {
            ChatError::Invalid(message) => AppError::bad_request("INVALID_INPUT", message),
            ChatError::NotFound(message) => AppError::not_found("CHANNEL_NOT_FOUND", message),
            ChatError::Forbidden { code, message } => AppError::forbidden(code, message),
            ChatError::Store(err) => self.store(err),
            ChatError::Chat(err) => self.chat(err),
        }
    }
}
