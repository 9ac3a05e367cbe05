//! Credential-management core: user account creation, password hashing, and
//! the identity store backing them. HTTP transport, sessions and migrations
//! live upstream; this crate only exposes the domain pieces they compose.

pub mod config;
pub mod db;
pub mod users;
