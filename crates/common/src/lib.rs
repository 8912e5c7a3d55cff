//! Error-context plumbing shared by the confab crates.

pub mod context;

pub use context::FromMessage;
