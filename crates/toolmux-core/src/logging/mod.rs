//! Logging abstractions

mod traits;
mod noop;
mod console;
mod memory;

pub use traits::{LogLevel, Logger};
pub use noop::NoOpLogger;
pub use console::ConsoleLogger;
pub use memory::MemoryLogger;
