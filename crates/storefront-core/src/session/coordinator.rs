//! Single-flight coordination of token refreshes.
//!
//! The coordinator is either idle or refreshing. The first request to report
//! an expired token while idle becomes the leader and performs the refresh;
//! any request reporting expiry while a refresh is in flight is queued and
//! receives the leader's outcome. The state lock is never held across an
//! `.await`.

use super::{SessionError, TokenStore};
use std::sync::{Mutex, PoisonError};
use storefront_types::SecretString;
use tokio::sync::oneshot;

/// Outcome of a refresh: the new access token or the failure every waiter sees.
pub type RefreshOutcome = Result<SecretString, SessionError>;

/// A request waiting for the in-flight refresh to settle.
struct PendingRequest {
	notify: oneshot::Sender<RefreshOutcome>,
}

enum RefreshState {
	Idle,
	Refreshing { pending: Vec<PendingRequest> },
}

/// What a request that saw a 401 should do next.
pub enum RefreshTicket<'a> {
	/// The token was replaced after the request was sent; replay with it.
	Current(SecretString),
	/// Perform the refresh and settle the guard with its outcome.
	Leader(RefreshGuard<'a>),
	/// Wait for the in-flight refresh.
	Follower(oneshot::Receiver<RefreshOutcome>),
}

/// Tracks whether a refresh is in flight and who is waiting for it.
pub struct SessionCoordinator {
	state: Mutex<RefreshState>,
}

impl Default for SessionCoordinator {
	fn default() -> Self {
		Self::new()
	}
}

impl SessionCoordinator {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(RefreshState::Idle),
		}
	}

	/// Registers a request whose token `sent_with` was rejected.
	///
	/// The check against the current token happens under the same lock the
	/// leader settles under, so a request whose 401 arrives just after a
	/// refresh completed replays instead of refreshing again.
	pub fn join(&self, sent_with: Option<&SecretString>, tokens: &TokenStore) -> RefreshTicket<'_> {
		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		match &mut *state {
			RefreshState::Refreshing { pending } => {
				let (notify, wait) = oneshot::channel();
				pending.push(PendingRequest { notify });
				tracing::debug!(queued = pending.len(), "Queued request behind token refresh");
				RefreshTicket::Follower(wait)
			},
			RefreshState::Idle => match tokens.access_token() {
				Some(current) if Some(&current) != sent_with => RefreshTicket::Current(current),
				_ => {
					*state = RefreshState::Refreshing {
						pending: Vec::new(),
					};
					RefreshTicket::Leader(RefreshGuard {
						coordinator: self,
						settled: false,
					})
				},
			},
		}
	}

	/// Whether a refresh is currently in flight.
	pub fn is_refreshing(&self) -> bool {
		matches!(
			*self.state.lock().unwrap_or_else(PoisonError::into_inner),
			RefreshState::Refreshing { .. }
		)
	}

	/// Number of requests waiting for the in-flight refresh.
	pub fn pending(&self) -> usize {
		match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
			RefreshState::Idle => 0,
			RefreshState::Refreshing { pending } => pending.len(),
		}
	}

	/// Returns to idle and hands `outcome` to every queued request.
	fn settle(&self, outcome: &RefreshOutcome) {
		let pending = {
			let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
			match std::mem::replace(&mut *state, RefreshState::Idle) {
				RefreshState::Refreshing { pending } => pending,
				RefreshState::Idle => Vec::new(),
			}
		};

		tracing::debug!(released = pending.len(), ok = outcome.is_ok(), "Refresh settled");
		for request in pending {
			// A waiter that gave up has dropped its receiver
			let _ = request.notify.send(outcome.clone());
		}
	}
}

/// Held by the leader for the duration of a refresh.
///
/// Dropping it unsettled rejects every queued request with
/// [`SessionError::RefreshAborted`] and returns the coordinator to idle.
pub struct RefreshGuard<'a> {
	coordinator: &'a SessionCoordinator,
	settled: bool,
}

impl RefreshGuard<'_> {
	/// Releases the queued requests with the refresh outcome.
	pub fn settle(mut self, outcome: &RefreshOutcome) {
		self.settled = true;
		self.coordinator.settle(outcome);
	}
}

impl Drop for RefreshGuard<'_> {
	fn drop(&mut self) {
		if !self.settled {
			tracing::warn!("Token refresh abandoned before completion");
			self.coordinator.settle(&Err(SessionError::RefreshAborted));
		}
	}
}
