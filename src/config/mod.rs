//! # Configuration Module
//!
//! Settings are layered from built-in defaults, `config/default.toml`,
//! `config/{RUN_ENV}.toml`, `APP__*` environment variables and finally the
//! plain variable names the mobile team already deploys with (`PORT`,
//! `FIREBASE_PROJECT_ID`, `STREAM_CHAT_API_KEY`, ...). A `.env` file is read
//! first via dotenvy.
//!
//! ```rust,ignore
//! use ovo_chat_backend::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("listening on {}", settings.server_addr());
//! ```

mod settings;

pub use settings::*;
