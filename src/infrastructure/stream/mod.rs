//! Stream Chat adapter.

mod client;
mod token;

pub use client::{filter_conditions, StreamChatClient};
pub use token::{server_token, user_token};
