pub mod app;
pub mod notifier;

pub use app::{Coordinator, ViewState};
pub use notifier::{CollectingNotifier, LogNotifier, Notice, NoticeKind, Notifier};
