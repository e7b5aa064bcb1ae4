pub mod monitor;
pub mod scan;
