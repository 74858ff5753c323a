//! This is the compiler and VM as a library. See `src/bin` for the driver
//! binary using this library.

pub mod back;
pub mod common;
pub mod front;
