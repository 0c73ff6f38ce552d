//! Domain models for fintrack's authentication core.
//!
//! These are plain data types shared by the auth, db and server crates.
//! None of them carry behaviour that touches storage or the network.

pub mod challenge;
pub mod identity;
pub mod principal;
pub mod recovery;
pub mod role;
