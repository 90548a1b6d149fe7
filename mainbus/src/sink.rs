use std::fmt::Display;

use chrono::Local;
use tracing::info;

use crate::Item;

/// Receives items as a consumer drains its lane.
///
/// A sink is called once per delivered item with the name of the bus, the
/// index of the lane the item travelled on and the item itself. Whatever the
/// sink does with it is invisible to the bus.
///
/// Any `FnMut(&str, usize, Item<T>)` closure is a sink.
///
/// # Examples
///
/// ```
/// use mainbus::{Item, Sink};
///
/// let mut seen = Vec::new();
/// let mut sink = |resource: &str, lane: usize, item: Item<&str>| {
///     seen.push(format!("{resource}/{lane}/{}", item.id()));
/// };
///
/// sink.deliver("iron", 1, Item::new(4, "iron", "Iron Plate"));
/// assert_eq!(seen, vec!["iron/1/4"]);
/// ```
pub trait Sink<T> {
    fn deliver(&mut self, resource: &str, lane: usize, item: Item<T>);
}

impl<T, F> Sink<T> for F
where
    F: FnMut(&str, usize, Item<T>),
{
    fn deliver(&mut self, resource: &str, lane: usize, item: Item<T>) {
        self(resource, lane, item)
    }
}

/// Logs every delivered item as a `tracing` event.
///
/// The message reads `[Consumer-iron-L2] ID:7 Value:Iron Plate Time:15:04:05`,
/// with the creation time rendered in local time.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl<T: Display> Sink<T> for LogSink {
    fn deliver(&mut self, resource: &str, lane: usize, item: Item<T>) {
        info!(
            resource,
            lane,
            id = item.id(),
            "{}",
            consumer_line(resource, lane, &item)
        );
    }
}

fn consumer_line<T: Display>(resource: &str, lane: usize, item: &Item<T>) -> String {
    format!(
        "[Consumer-{}-L{}] ID:{} Value:{} Time:{}",
        resource,
        lane,
        item.id(),
        item.payload(),
        item.created_at().with_timezone(&Local).format("%H:%M:%S")
    )
}
