pub mod chat_config;

pub use chat_config::{
    config_dir, ChatConfig, ChatSettings, ProviderConfig, StoreConfig, CONFIG_FILE_NAME,
    DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_REFERER, DEFAULT_TITLE,
};
