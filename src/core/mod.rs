//! Core pipeline logic: mapping, batch load, query construction,
//! verification, and run coordination

pub mod load;
pub mod map;
pub mod pipeline;
pub mod query;
pub mod verify;
