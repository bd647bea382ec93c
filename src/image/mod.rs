//! Image decoding and preprocessing.

pub mod decode;
pub mod enhance;

pub use decode::decode_image;
pub use enhance::enhance_for_recognition;
