// src/lib.rs

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod services;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
