#![allow(clippy::new_without_default)]

pub mod cache;
pub mod error;
pub mod json;
pub mod library;
pub mod migrate;
pub mod model;
pub mod registry;
pub mod store;
