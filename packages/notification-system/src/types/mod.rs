//! Value types shared by every stage of a watch cycle.

pub mod change;
pub mod config;
pub mod document;
pub mod record;
pub mod snapshot;
