//! Persistence of reconstructed images

pub mod image_writer;

pub use image_writer::{read_image, write_image};
