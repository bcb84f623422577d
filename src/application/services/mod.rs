//! Application Services
//!
//! Business logic services that coordinate the provider ports.
//!
//! ## Available Services
//!
//! - **UserService**: user sync across identity, profile store and chat provider
//! - **ChatService**: direct-message and group channels, discovery and membership
//! - **AuthService**: internal service-to-service tokens

pub mod auth_service;
pub mod chat_service;
pub mod user_service;

// Re-export auth service types
pub use auth_service::{AuthError, AuthService, AuthServiceImpl, Claims, IssuedToken};

// Re-export chat service types
pub use chat_service::{
    AnalyticsRange, ChannelAnalytics, ChannelCreated, ChannelDeleted, ChannelSummary, ChannelUpdated, ChatError,
    ChatService, ChatServiceImpl, Conversation, ConversationOptions, DirectMessageOptions, GroupOptions, JoinedChannel,
    LeftChannel, MemberPage, MemberView, MembersAdded, MembersRemoved, MessageView, Timeframe,
};

// Re-export user service types
pub use user_service::{
    SyncedUser, UserError, UserFilters, UserProfileView, UserService, UserServiceImpl, UserStats, UserToken,
    UserUpdate,
};
