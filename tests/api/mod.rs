mod auth_tests;
mod channel_tests;
mod chat_tests;
mod health_tests;
mod middleware_tests;
mod provider_tests;
mod user_tests;
