#![forbid(unsafe_code)]

//! Foundation types for the spacecache crates: signed geometry, change
//! masks, and synchronous listener lists.

pub mod change;
pub mod geometry;
pub mod notify;
