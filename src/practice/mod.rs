//! Firm practice rules layered over the store: case numbering, read-time
//! joins, role permissions, login, and demo data.

pub mod access;
pub mod case_number;
pub mod joins;
pub mod seed;
pub mod session;
