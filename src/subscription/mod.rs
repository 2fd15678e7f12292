//! Weak event subscriptions
//!
//! [`WeakSubscriptionBroker`] subscribes an observer to a
//! [`ChangeSource`](crate::events::ChangeSource) without keeping the observer
//! alive. The returned [`SubscriptionHandle`] ends the subscription when it is
//! disposed or dropped; [`SubscriptionSet`] groups handles that end together.

pub mod broker;
pub mod handle;
mod link;
pub mod set;

pub use broker::{BrokerStats, WeakSubscriptionBroker};
pub use handle::SubscriptionHandle;
pub use set::SubscriptionSet;
