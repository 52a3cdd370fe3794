#![cfg_attr(not(test), no_std)]
#[cfg(test)]
extern crate std;

pub mod config;
pub mod drivers;
pub mod error;
pub mod hal;
pub mod log;
pub mod rtio;
pub mod time;

pub use paste;
