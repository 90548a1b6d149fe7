pub mod bus;
pub mod config;
pub mod error;
pub mod item;
pub mod lane;
pub mod sink;

// Re-export commonly used types
pub use bus::ResourceBus;
pub use config::BusConfig;
pub use error::BusError;
pub use item::Item;
pub use lane::Lane;
pub use sink::{LogSink, Sink};
