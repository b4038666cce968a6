pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod i18n;
pub mod middleware;
pub mod security;
pub mod templates;
pub mod web;
