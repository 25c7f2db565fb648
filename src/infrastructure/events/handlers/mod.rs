//! Stream consumers

mod audit;
mod notification;
mod trigger;

pub use audit::AuditLogHandler;
pub use notification::{NotificationHandler, NotificationsConfig};
pub use trigger::ExecutionTriggerHandler;
