//! Storage Adapter

mod json_roster;

pub use json_roster::JsonRosterStore;
