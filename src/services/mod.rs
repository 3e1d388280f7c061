pub mod auth_poller;
pub mod notifier;
pub mod selector_registry;

pub use auth_poller::{LoginPoller, LoginState};
pub use notifier::CompletionNotifier;
pub use selector_registry::{Locator, SelectorRegistry, Target};
