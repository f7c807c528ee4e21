// Usage tracking
//
// Every user-visible action (chat messages, assistant lifecycle, model
// pulls) gets one line in an append-only log file.

pub mod usage;

pub use usage::{UsageEntry, UsageLog};
