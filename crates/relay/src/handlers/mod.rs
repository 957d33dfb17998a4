//! Concrete command handlers
//!
//! Each handler is a separate module for clarity.

pub mod cookies;
pub mod screenshot;
pub mod storage;

pub use cookies::CookiesHandler;
pub use screenshot::ScreenshotHandler;
pub use storage::StorageHandler;
