pub mod backend;
pub mod client;
pub mod config;
pub mod console;
pub mod content;
pub mod error;
pub mod events;
pub mod models;
pub mod seed; // in-memory demo backend
pub mod session;
pub mod storage;
pub mod views;

// Re-export commonly used items for the CLI / external users
pub use console::Console;
pub use error::{ConsoleError, ConsoleResult};
