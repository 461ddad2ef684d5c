//! Bundled middleware for the common cross-cutting concerns.

pub mod auth;
pub mod cache;
pub mod hooks;
pub mod i18n;
pub mod logging;

pub use auth::AuthMiddleware;
pub use cache::CacheMiddleware;
pub use hooks::{AfterHook, BeforeHook, HooksMiddleware};
pub use i18n::I18nMiddleware;
pub use logging::{LogSink, LoggingMiddleware};
