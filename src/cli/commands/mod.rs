pub mod config;
pub mod serve;
pub mod signing;
pub mod token;
pub mod translations;
