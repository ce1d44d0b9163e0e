pub mod config;
pub mod manager;


pub use config::{
    api_key_from, api_key_from_env, CacheSettings, RetrySettings, Settings, API_KEY_ENV,
    DEFAULT_INSTRUCTIONS,
};
pub use manager::SettingsManager;
