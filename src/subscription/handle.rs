use super::link::{CloseReason, Registration};
use super::set::SubscriptionSet;
use std::fmt;
use std::sync::Arc;

/// Owned token for one active subscription
///
/// Disposing the handle, or dropping it, removes the registration from the
/// change source. Disposal is idempotent and may race with the broker's own
/// self-unsubscription; after `dispose` returns no new delivery starts, though
/// a delivery already running on another thread may finish.
#[must_use = "dropping a SubscriptionHandle ends the subscription"]
pub struct SubscriptionHandle {
    registration: Arc<dyn Registration>,
}

impl SubscriptionHandle {
    pub(crate) fn new(registration: Arc<dyn Registration>) -> Self {
        Self { registration }
    }

    /// Unsubscribes from the change source
    pub fn dispose(&self) {
        self.registration.close(CloseReason::Disposed);
    }

    /// True once disposed, or once the broker found the observer dead
    pub fn is_disposed(&self) -> bool {
        !self.registration.is_open()
    }

    /// Hands ownership of this handle to `set`
    pub fn add_to(self, set: &SubscriptionSet) {
        set.add(self);
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
