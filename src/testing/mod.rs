//! Testing utilities and mock implementations
//!
//! Mock providers, tools and scripted agents for exercising processors
//! without network access or API keys.

pub mod mocks;

pub use mocks::*;
