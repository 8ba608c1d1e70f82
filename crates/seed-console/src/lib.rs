pub mod bounded_log;
pub mod commands;
pub mod config;
pub mod panel;
pub mod roster;
pub mod router;
pub mod service;
pub mod session;
pub mod status_slot;
pub mod theme;
pub mod transport;
pub mod ui;
