//! Casepilot: a case management backend for small law firms.
//!
//! The crate is split into the system of record ([`db`]), practice rules
//! that sit between the store and the API ([`practice`]), and the HTTP
//! gateway ([`channels::web`]).

pub mod channels;
pub mod config;
pub mod db;
pub mod error;
pub mod practice;
pub mod settings;

#[cfg(test)]
mod testing;
