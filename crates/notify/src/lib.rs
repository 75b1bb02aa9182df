pub mod notifier;
pub mod registry;

pub use notifier::{CompletionNotifier, HttpCompletionNotifier, NotifyError};
pub use registry::{CompletionEvent, CompletionStatus, NotificationRegistry};
