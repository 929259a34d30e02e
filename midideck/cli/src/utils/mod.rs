pub mod locations;
pub mod logger;
