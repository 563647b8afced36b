//! HTTP handlers

pub mod auth;
pub mod chat;
pub mod documents;
pub mod funds;
pub mod health;
pub mod users;
