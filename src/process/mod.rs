pub mod builder;

pub use builder::{Operation, RegistryProcessBuilder};
