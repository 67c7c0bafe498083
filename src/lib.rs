//! Library crate for pollamania-back, exposing modules for the server and helper binaries.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
