pub mod automation;
pub mod types;

pub use automation::RepositoryAutomationClient;
pub use types::{AutomationPlan, RunReport};
