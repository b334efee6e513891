//! Pick photos, then either upload each one as a base64 form field or copy
//! them into a timestamped album.

pub mod album_store;
pub mod appearance;
pub mod commands;
pub mod config;
pub mod controller;
pub mod errors;
pub mod image_processor;
pub mod media_source;
pub mod security;
pub mod uploader;
