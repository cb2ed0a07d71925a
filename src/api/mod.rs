pub mod uploads;
pub mod network;
