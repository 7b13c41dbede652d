pub mod config;
pub mod credentials;
pub mod error;
pub mod platform;
pub mod workflow;
pub mod workspace;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use workflow::{AutomationPlan, RepositoryAutomationClient, RunReport};
