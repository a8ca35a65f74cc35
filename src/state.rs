//! Auth-state broadcasting and the single-resolution readiness signal.
//!
//! The provider publishes every settled auth state through an [`AuthStateChannel`]; observers hold
//! [`AuthStateSubscription`] handles that stop observing once dropped or
//! [`unsubscribed`](AuthStateSubscription::unsubscribe). [`Readiness`] is resolved exactly once by
//! the bootstrapper and replays the settled value to late subscribers.

// crates.io
use tokio::sync::watch;
// self
use crate::{_prelude::*, auth::SessionUser};

/// Provider auth state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AuthState {
	/// The provider has not yet determined whether a session exists.
	#[default]
	Initializing,
	/// The provider settled on a user, or on no user.
	Settled(Option<SessionUser>),
}
impl AuthState {
	/// Settled user, if any.
	pub fn user(&self) -> Option<&SessionUser> {
		match self {
			Self::Settled(user) => user.as_ref(),
			Self::Initializing => None,
		}
	}

	/// Returns `true` once the provider has settled.
	pub fn is_settled(&self) -> bool {
		matches!(self, Self::Settled(_))
	}
}

/// Publisher side of the provider's auth state.
#[derive(Clone, Debug)]
pub struct AuthStateChannel(Arc<watch::Sender<AuthState>>);
impl AuthStateChannel {
	/// Creates a channel in [`AuthState::Initializing`].
	pub fn new() -> Self {
		Self(Arc::new(watch::Sender::new(AuthState::Initializing)))
	}

	/// Creates a channel that is already settled.
	pub fn settled(user: Option<SessionUser>) -> Self {
		Self(Arc::new(watch::Sender::new(AuthState::Settled(user))))
	}

	/// Replaces the state and notifies every subscriber.
	pub fn publish(&self, user: Option<SessionUser>) {
		self.0.send_replace(AuthState::Settled(user));
	}

	/// Latest state.
	pub fn current(&self) -> AuthState {
		self.0.borrow().clone()
	}

	/// Latest settled user.
	pub fn current_user(&self) -> Option<SessionUser> {
		self.0.borrow().user().cloned()
	}

	/// Registers an observer.
	///
	/// The first [`AuthStateSubscription::next`] call yields the current state when it is already
	/// settled, then every later publication.
	pub fn subscribe(&self) -> AuthStateSubscription {
		let mut rx = self.0.subscribe();

		rx.mark_changed();

		AuthStateSubscription { rx: Some(rx) }
	}
}
impl Default for AuthStateChannel {
	fn default() -> Self {
		Self::new()
	}
}

/// Cancellable auth-state observer.
#[derive(Debug)]
pub struct AuthStateSubscription {
	rx: Option<watch::Receiver<AuthState>>,
}
impl AuthStateSubscription {
	/// Waits for the next settled auth state.
	///
	/// Returns `None` once the subscription is cancelled or the publisher is gone.
	pub async fn next(&mut self) -> Option<Option<SessionUser>> {
		let rx = self.rx.as_mut()?;

		loop {
			if rx.changed().await.is_err() {
				self.rx = None;

				return None;
			}

			if let AuthState::Settled(user) = &*rx.borrow_and_update() {
				return Some(user.clone());
			}
		}
	}

	/// Waits for the next settled state that carries a user.
	pub async fn next_user(&mut self) -> Option<SessionUser> {
		loop {
			if let Some(user) = self.next().await? {
				return Some(user);
			}
		}
	}

	/// Stops observing.
	pub fn unsubscribe(&mut self) {
		self.rx = None;
	}

	/// Returns `true` until the subscription is cancelled or the publisher is gone.
	pub fn is_active(&self) -> bool {
		self.rx.is_some()
	}
}

/// Single-resolution, multicast signal yielding the user that initial sign-in settled on.
#[derive(Clone, Debug)]
pub struct Readiness(Arc<watch::Sender<Option<Option<SessionUser>>>>);
impl Readiness {
	/// Creates an unresolved signal.
	pub fn new() -> Self {
		Self(Arc::new(watch::Sender::new(None)))
	}

	/// Resolves the signal. Only the first call has an effect; returns whether it did.
	pub fn resolve(&self, user: Option<SessionUser>) -> bool {
		self.0.send_if_modified(|slot| {
			if slot.is_some() {
				return false;
			}

			*slot = Some(user);

			true
		})
	}

	/// Returns `true` once [`Readiness::resolve`] has run.
	pub fn is_resolved(&self) -> bool {
		self.0.borrow().is_some()
	}

	/// Resolved value without waiting.
	pub fn peek(&self) -> Option<Option<SessionUser>> {
		self.0.borrow().clone()
	}

	/// Waits for resolution; late callers receive the settled value immediately.
	pub async fn wait(&self) -> Option<SessionUser> {
		let mut rx = self.0.subscribe();

		match rx.wait_for(Option::is_some).await {
			Ok(value) => value.clone().flatten(),
			// The sender lives inside `self`, so the channel cannot close while waiting.
			Err(_) => None,
		}
	}
}
impl Default for Readiness {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::UserId;

	fn guest(uid: &str) -> SessionUser {
		SessionUser::anonymous(UserId::new(uid).expect("User fixture should be valid."))
	}

	#[tokio::test]
	async fn subscription_replays_settled_state_then_follows_updates() {
		let channel = AuthStateChannel::settled(None);
		let mut sub = channel.subscribe();

		assert_eq!(sub.next().await, Some(None));

		channel.publish(Some(guest("g-1")));

		assert_eq!(sub.next().await, Some(Some(guest("g-1"))));
	}

	#[tokio::test]
	async fn initializing_state_is_not_reported() {
		let channel = AuthStateChannel::new();
		let mut sub = channel.subscribe();
		let publisher = channel.clone();
		let waiter = tokio::spawn(async move { sub.next().await });

		tokio::task::yield_now().await;
		publisher.publish(None);

		assert_eq!(waiter.await.expect("Waiter task should finish."), Some(None));
	}

	#[tokio::test]
	async fn unsubscribed_handles_stop_yielding() {
		let channel = AuthStateChannel::settled(None);
		let mut sub = channel.subscribe();

		sub.unsubscribe();

		assert!(!sub.is_active());
		assert_eq!(sub.next().await, None);
	}

	#[tokio::test]
	async fn readiness_resolves_once_and_replays() {
		let readiness = Readiness::new();

		assert!(!readiness.is_resolved());
		assert!(readiness.resolve(Some(guest("first"))));
		assert!(!readiness.resolve(None));
		assert_eq!(readiness.wait().await, Some(guest("first")));
		assert_eq!(readiness.clone().wait().await, Some(guest("first")));
		assert_eq!(readiness.peek(), Some(Some(guest("first"))));
	}
}
