//! Live delivery of newly sent messages to connected viewers.
//!
//! - [`BroadcastRegistry`]: which channels watch which chat
//! - [`SubscriptionSession`]: one viewer's registration, released on drop

pub mod registry;
pub mod session;

pub use registry::{
    BroadcastRegistry, BroadcastReport, Delivery, DeliveryChannel, DeliveryError, SubscriberId,
};
pub use session::{SessionState, SubscriptionSession};
