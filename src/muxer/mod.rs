//! AVI container muxing

pub mod avi;
pub mod header;
pub mod index;
pub mod riff;

pub use avi::AviWriter;
pub use riff::FourCc;
