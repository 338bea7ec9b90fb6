//! Background worker entrypoint adapters.

pub mod periodic;

pub use periodic::periodic;
