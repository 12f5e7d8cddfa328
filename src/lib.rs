#[cfg(not(unix))]
compile_error!("Only unix platforms are currently supported");

pub mod controller;
pub mod simulated;

pub use courier_delivery as delivery;
