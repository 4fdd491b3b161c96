pub mod loader;
pub mod schema;
pub mod selectors;

pub use loader::{load_config, load_config_from_str, validate_config};
pub use schema::{DuplicateDeliveryPolicy, EngineConfig, TargetConfig, Timings};
pub use selectors::SelectorCatalog;
