//! Notification delivery channel constants.

/// In-app notification (a row in the `notifications` table).
pub const CHANNEL_IN_APP: &str = "in_app";
