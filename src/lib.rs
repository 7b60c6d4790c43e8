pub mod error;
pub mod mail;
pub mod services;
pub mod storage;
pub mod structs;
pub mod views;
pub mod workers;
