//! In-app notification module.
//!
//! Notifications are advisory only: their loss or duplication never affects
//! order or invoice correctness (lossy by design, no backpressure on the
//! payment path).

pub mod notification;

pub use notification::{Notification, NotificationKind};
