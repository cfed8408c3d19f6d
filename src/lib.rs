pub use seaflux_core::*;

#[cfg(feature = "python")]
mod python;
