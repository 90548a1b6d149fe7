use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit of data carried along a [`ResourceBus`](crate::ResourceBus).
///
/// Items are created once by a producer and never mutated afterwards. Each
/// item carries a numeric id, the name of the resource it belongs to, an
/// arbitrary payload and the moment it was created.
///
/// # Examples
///
/// ```
/// use mainbus::Item;
///
/// let plate = Item::new(7, "iron", "Iron Plate");
///
/// assert_eq!(plate.id(), 7);
/// assert_eq!(plate.resource(), "iron");
/// assert_eq!(*plate.payload(), "Iron Plate");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item<T> {
    id: u64,
    resource: String,
    payload: T,
    created_at: DateTime<Utc>,
}

impl<T> Item<T> {
    /// Creates a new item stamped with the current time.
    pub fn new(id: u64, resource: impl Into<String>, payload: T) -> Self {
        Self::with_timestamp(id, resource, payload, Utc::now())
    }

    /// Creates a new item with an explicit creation time.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use mainbus::Item;
    ///
    /// let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 0).unwrap();
    /// let item = Item::with_timestamp(1, "copper", 42u32, at);
    ///
    /// assert_eq!(item.created_at(), at);
    /// ```
    pub fn with_timestamp(
        id: u64,
        resource: impl Into<String>,
        payload: T,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            resource: resource.into(),
            payload,
            created_at,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The resource tag the producer attached to this item.
    ///
    /// The bus never checks this against its own resource name.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Consumes the item, returning its payload.
    pub fn into_payload(self) -> T {
        self.payload
    }
}
