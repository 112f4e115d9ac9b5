pub mod config;
pub mod device;
pub mod docs;
pub mod inventory;
pub mod ipam;
pub mod models;
pub mod ports;
pub mod render;
pub mod tasks;
pub mod utils;
