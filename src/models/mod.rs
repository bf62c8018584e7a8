//! Model catalogs for speech recognition and text generation.

pub mod catalog;
pub mod generator_catalog;
