pub mod binder;
pub mod compact;
pub mod describe;
pub mod error;
pub mod flow;
pub mod schema;
pub mod task;
pub mod validation;

/// The loosely-typed value used for configuration, since it is used everywhere.
pub type ConfigValue = serde_json::Value;

/// Raw configuration: string keys to loosely-typed values, before binding.
pub type RawConfig = serde_json::Map<String, ConfigValue>;
