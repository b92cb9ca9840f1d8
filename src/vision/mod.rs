//! Image understanding

pub mod captioner;

pub use captioner::BlipCaptioner;
