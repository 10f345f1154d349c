// externally visible interfaces
pub mod cycle;
pub mod error;
pub mod home_assistant;
pub mod home_assistant_config;
pub mod http;
pub mod metric_collector;
pub mod mqtt_config;
pub mod mqtt_wrapper;
pub mod scheduler;
pub mod schema;
pub mod table;
pub mod tigo;
pub mod value;
