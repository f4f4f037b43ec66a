pub mod accessory;
pub mod config;
pub mod diff;
pub mod directory;
pub mod gateway;
pub mod history;
pub mod reconcile;
pub mod sources;
pub mod sync;

pub use accessory::Accessory;
pub use config::Config;
pub use config::ConfigError;
pub use directory::MqttDeviceDirectory;
pub use gateway::HttpObjectClient;
pub use gateway::ObjectClient;
pub use sync::Mapping;
