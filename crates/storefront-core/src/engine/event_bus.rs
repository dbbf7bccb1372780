//! Broadcast channel carrying client events.
//!
//! Every component publishes through a clone of the same bus; the
//! surrounding application subscribes to react to session invalidation and
//! order changes.

use storefront_types::StorefrontEvent;
use tokio::sync::broadcast;

/// Multi-producer, multi-consumer bus of [`StorefrontEvent`]s.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<StorefrontEvent>,
}

impl EventBus {
	/// Creates a bus buffering up to `capacity` events per lagging subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Subscribes to events published from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<StorefrontEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event and returns the number of subscribers reached.
	///
	/// Fails only when nobody is subscribed, which callers ignore.
	pub fn publish(
		&self,
		event: StorefrontEvent,
	) -> Result<usize, broadcast::error::SendError<StorefrontEvent>> {
		self.sender.send(event)
	}
}
