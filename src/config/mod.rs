pub mod catalog;
pub mod settings;

pub use catalog::ToolCatalog;
pub use settings::{Credentials, Settings};
