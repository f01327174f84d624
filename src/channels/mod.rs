//! Inbound channels. The HTTP gateway is the only one.

pub mod web;
