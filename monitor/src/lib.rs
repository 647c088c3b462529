pub mod app;
pub mod busy;
pub mod config_store;
pub mod dashboard;
pub mod error;
pub mod gate;
pub mod grouping;
pub mod hook_toggle;
pub mod installer;
pub mod live_ui;
pub mod registry;
pub mod unicode_utils;

pub use app::{App, AppOptions, View};
pub use config_store::ConfigStore;
pub use dashboard::DashboardModel;
pub use error::{ActionError, HookAction, InstallTarget};
pub use gate::InstallationGate;
pub use grouping::{group_instances, ExpandedGroups, InstanceGroup, UNKNOWN_GROUP_KEY};
pub use hook_toggle::HookToggle;
pub use installer::InstallerTrigger;
pub use registry::{InstanceRegistry, PollingHandle, RegistrySnapshot};
