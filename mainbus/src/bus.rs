use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinSet;
use tracing::{debug, trace};

use crate::{BusConfig, BusError, Item, Lane, Sink};

/// A named resource channel made of parallel [`Lane`]s.
///
/// Producers call [`produce`](ResourceBus::produce); each item is routed to one
/// lane picked uniformly at random. One consumer task per lane drains it with
/// [`consume`](ResourceBus::consume) until the bus is
/// [`close`](ResourceBus::close)d and the lane is empty.
///
/// The lane count is always even: an odd request is rounded up by one. A bus
/// with no lanes silently drops everything it is given.
///
/// Items keep their order within a lane. There is no ordering across lanes:
/// two items produced back to back can reach their consumers in either order.
///
/// # Type Parameters
///
/// * `T` - The payload carried by each [`Item`]
/// * `R` - The random source used for lane selection
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use mainbus::{Item, ResourceBus};
/// use tokio::task::JoinSet;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let bus = Arc::new(ResourceBus::new("iron", 3, 5));
/// assert_eq!(bus.lane_count(), 4);
///
/// let mut consumers = JoinSet::new();
/// bus.spawn_consumers(&mut consumers, |_lane| {
///     |_resource: &str, _lane: usize, _item: Item<&str>| {}
/// });
///
/// for id in 0..8 {
///     bus.produce(Item::new(id, "iron", "Iron Plate")).await;
/// }
/// bus.close();
///
/// let mut delivered = 0;
/// while let Some(done) = consumers.join_next().await {
///     delivered += done.unwrap().unwrap();
/// }
/// assert_eq!(delivered, 8);
/// # });
/// ```
pub struct ResourceBus<T, R = StdRng> {
    resource: String,
    lane_capacity: usize,
    lanes: Vec<Lane<T>>,
    closed: AtomicBool,
    rng: Mutex<R>,
}

impl<T> ResourceBus<T, StdRng> {
    /// Creates a bus whose lanes are picked with an entropy-seeded generator.
    ///
    /// # Arguments
    ///
    /// * `resource` - The name of the resource this bus carries
    /// * `lane_count` - Requested number of lanes, rounded up to even
    /// * `lane_capacity` - Items each lane buffers; `0` makes every produce
    ///   wait for a consumer
    pub fn new(resource: impl Into<String>, lane_count: usize, lane_capacity: usize) -> Self {
        Self::with_rng(resource, lane_count, lane_capacity, StdRng::from_entropy())
    }

    /// Creates a bus from its configuration.
    ///
    /// A configured seed makes lane selection reproducible.
    ///
    /// # Examples
    ///
    /// ```
    /// use mainbus::{BusConfig, ResourceBus};
    ///
    /// let config = BusConfig::new("copper").lanes(1);
    /// let bus: ResourceBus<&str> = ResourceBus::from_config(&config);
    ///
    /// assert_eq!(bus.resource(), "copper");
    /// assert_eq!(bus.lane_count(), 2);
    /// assert_eq!(bus.lane_capacity(), 20);
    /// ```
    pub fn from_config(config: &BusConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config.resource.clone(), config.lanes, config.capacity, rng)
    }
}

impl<T, R: Rng> ResourceBus<T, R> {
    /// Creates a bus that picks lanes with the given random source.
    ///
    /// # Examples
    ///
    /// ```
    /// use mainbus::ResourceBus;
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let rng = StdRng::seed_from_u64(1);
    /// let bus: ResourceBus<u32, _> = ResourceBus::with_rng("coal", 0, 10, rng);
    ///
    /// assert_eq!(bus.lane_count(), 0);
    /// ```
    pub fn with_rng(
        resource: impl Into<String>,
        lane_count: usize,
        lane_capacity: usize,
        rng: R,
    ) -> Self {
        let resource = resource.into();
        let lane_count = lane_count + lane_count % 2;
        let lanes = (0..lane_count).map(|_| Lane::new(lane_capacity)).collect();

        debug!(%resource, lane_count, lane_capacity, "resource bus created");

        Self {
            resource,
            lane_capacity,
            lanes,
            closed: AtomicBool::new(false),
            rng: Mutex::new(rng),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn lane_capacity(&self) -> usize {
        self.lane_capacity
    }

    /// Returns `true` once the bus has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Sends an item down a randomly chosen lane.
    ///
    /// Suspends while the chosen lane is full. There is no fallback to
    /// another lane. On a bus with no lanes the item is dropped.
    ///
    /// # Panics
    ///
    /// Panics if the bus has already been closed, or is closed while this
    /// call is suspended on a full lane. Producing after close is a
    /// caller bug; use [`try_produce`](ResourceBus::try_produce) to get the
    /// error back instead.
    pub async fn produce(&self, item: Item<T>) {
        if let Err(err) = self.try_produce(item).await {
            panic!("{err}");
        }
    }

    /// Sends an item down a randomly chosen lane, reporting misuse as an error.
    ///
    /// # Returns
    ///
    /// * `Ok(())` once the item is queued, or immediately on a bus with no lanes
    /// * `Err(BusError::ProduceAfterClose)` if the bus was closed before the
    ///   item got into its lane
    pub async fn try_produce(&self, item: Item<T>) -> Result<(), BusError> {
        if self.lanes.is_empty() {
            return Ok(());
        }

        let lane = self.pick_lane();
        trace!(resource = %self.resource, lane, id = item.id(), "routing item");

        self.lanes[lane]
            .push(item)
            .await
            .map_err(|_| BusError::ProduceAfterClose {
                resource: self.resource.clone(),
                lane,
            })
    }

    /// Drains one lane into a sink until the bus is closed and the lane empty.
    ///
    /// Items are handed to the sink in the order they entered this lane.
    /// Items still buffered when the bus closes are delivered before this
    /// returns.
    ///
    /// # Returns
    ///
    /// * `Ok(count)` with the number of items delivered
    /// * `Err(BusError::NoSuchLane)` if `lane` is out of range
    pub async fn consume<S: Sink<T>>(&self, lane: usize, mut sink: S) -> Result<usize, BusError> {
        let queue = self.lanes.get(lane).ok_or_else(|| BusError::NoSuchLane {
            resource: self.resource.clone(),
            lane,
            lane_count: self.lanes.len(),
        })?;

        let mut delivered = 0;
        while let Some(item) = queue.pop().await {
            sink.deliver(&self.resource, lane, item);
            delivered += 1;
        }

        debug!(resource = %self.resource, lane, delivered, "lane drained");
        Ok(delivered)
    }

    /// Closes every lane for production.
    ///
    /// Buffered items stay put and are still delivered. A produce still
    /// waiting on a full lane when this runs fails with
    /// [`BusError::ProduceAfterClose`]; its item is not delivered.
    ///
    /// # Panics
    ///
    /// Panics if the bus was already closed. A bus must be closed exactly
    /// once; use [`try_close`](ResourceBus::try_close) to get the error back
    /// instead.
    pub fn close(&self) {
        if let Err(err) = self.try_close() {
            panic!("{err}");
        }
    }

    /// Closes every lane for production, reporting a second close as an error.
    pub fn try_close(&self) -> Result<(), BusError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(BusError::AlreadyClosed {
                resource: self.resource.clone(),
            });
        }

        for lane in &self.lanes {
            lane.close();
        }

        debug!(resource = %self.resource, lanes = self.lanes.len(), "resource bus closed");
        Ok(())
    }

    fn pick_lane(&self) -> usize {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0..self.lanes.len())
    }
}

impl<T, R> ResourceBus<T, R>
where
    T: Send + 'static,
    R: Rng + Send + 'static,
{
    /// Spawns one consumer task per lane onto `tasks`.
    ///
    /// `make_sink` is called with each lane index to build that lane's sink.
    /// Every task resolves to the result of [`consume`](ResourceBus::consume)
    /// once its lane is closed and drained, so joining all of `tasks` waits
    /// for the whole bus to finish.
    pub fn spawn_consumers<S, F>(
        self: &Arc<Self>,
        tasks: &mut JoinSet<Result<usize, BusError>>,
        mut make_sink: F,
    ) where
        S: Sink<T> + Send + 'static,
        F: FnMut(usize) -> S,
    {
        for lane in 0..self.lanes.len() {
            let bus = Arc::clone(self);
            let sink = make_sink(lane);
            tasks.spawn(async move { bus.consume(lane, sink).await });
        }
    }
}

impl<T, R> std::fmt::Debug for ResourceBus<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceBus")
            .field("resource", &self.resource)
            .field("lanes", &self.lanes)
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}
