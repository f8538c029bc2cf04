//! Timed chat polls: start, vote, stop, list and tally, backed by SQLite.

pub mod api;
pub mod clock;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod messages;
pub mod polls;
pub mod routes;
pub mod sse;
pub mod startup;
