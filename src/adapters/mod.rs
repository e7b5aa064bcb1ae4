pub mod csv_bar_adapter;
pub mod file_config_adapter;
pub mod json_store;
pub mod memory_store;
pub mod paper_broker;
pub mod settings;
