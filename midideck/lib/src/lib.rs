pub mod bridge;
pub mod devices;
pub mod midi;
pub mod session;
pub mod transport;
