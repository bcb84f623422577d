//! Platform Configuration Bridge
//!
//! Method-call dispatcher for the app's `com.ovo_meet.ovo/config` channel.
//! Values come from platform metadata, which the server fills from
//! settings; `GET /api/config/maps-key` is the HTTP face of
//! `getGoogleApiKey`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PlatformSettings;

pub const CONFIG_CHANNEL: &str = "com.ovo_meet.ovo/config";
pub const GET_GOOGLE_API_KEY: &str = "getGoogleApiKey";
pub const MAPS_API_KEY_METADATA: &str = "com.google.android.geo.API_KEY";

/// String metadata the platform exposes to the app.
#[derive(Debug, Clone, Default)]
pub struct PlatformMetadata {
    values: HashMap<String, String>,
}

impl PlatformMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &PlatformSettings) -> Self {
        let mut metadata = Self::new();
        if let Some(key) = settings.google_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            metadata.insert(MAPS_API_KEY_METADATA, key);
        }
        metadata
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Value::Null,
        }
    }
}

/// Outcome of a method call: a value, a coded error, or an unknown method.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MethodResult {
    Success {
        value: Value,
    },
    Error {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
    NotImplemented,
}

impl MethodResult {
    fn error(code: &str, message: &str) -> Self {
        Self::Error {
            code: code.to_owned(),
            message: message.to_owned(),
            details: None,
        }
    }
}

/// Handler for the config channel.
#[derive(Debug, Clone, Default)]
pub struct ConfigBridge {
    metadata: PlatformMetadata,
}

impl ConfigBridge {
    pub fn new(metadata: PlatformMetadata) -> Self {
        Self { metadata }
    }

    pub fn channel(&self) -> &'static str {
        CONFIG_CHANNEL
    }

    pub fn handle(&self, call: &MethodCall) -> MethodResult {
        match call.method.as_str() {
            GET_GOOGLE_API_KEY => match self.google_api_key() {
                Some(key) => MethodResult::Success {
                    value: Value::String(key.to_owned()),
                },
                None => MethodResult::error("UNAVAILABLE", "Google API key not available"),
            },
            other => {
                tracing::debug!(channel = CONFIG_CHANNEL, method = other, "Method not implemented");
                MethodResult::NotImplemented
            }
        }
    }

    pub fn google_api_key(&self) -> Option<&str> {
        self.metadata.get_string(MAPS_API_KEY_METADATA)
    }
}
