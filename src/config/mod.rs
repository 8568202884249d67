/// Configuration system
///
/// - `macros`: the `config_struct!` declaration macro
/// - `schemas`: every configuration section with its defaults
/// - `utils`: loading, env overrides and global access
pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::{
    Config, HubConfig, OverflowPolicy, SourceConfig, StorageConfig, WebserverConfig, WindowConfig,
};
pub use utils::{
    apply_env_overrides, get_config_clone, load_config_from_path, parse_config, with_config,
};
