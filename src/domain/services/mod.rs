//! # Domain Services
//!
//! - **ChannelPolicy**: who may add, remove, update and delete in a channel

mod channel_policy;

pub use channel_policy::*;
