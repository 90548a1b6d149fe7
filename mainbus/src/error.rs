use thiserror::Error;

/// Misuse of a [`ResourceBus`](crate::ResourceBus).
///
/// None of these are transient: each one is a caller bug. The panicking
/// operations ([`produce`](crate::ResourceBus::produce) and
/// [`close`](crate::ResourceBus::close)) abort with this message, the `try_`
/// variants hand it back instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// An item was produced after the bus had been closed.
    #[error("produce on closed bus '{resource}' (lane {lane})")]
    ProduceAfterClose { resource: String, lane: usize },

    /// The bus was closed a second time.
    #[error("close of closed bus '{resource}'")]
    AlreadyClosed { resource: String },

    /// A consumer asked for a lane the bus does not have.
    #[error("consume on bus '{resource}': no lane {lane} (bus has {lane_count} lanes)")]
    NoSuchLane {
        resource: String,
        lane: usize,
        lane_count: usize,
    },
}
