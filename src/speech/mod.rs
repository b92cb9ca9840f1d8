//! Speech input and output wrappers

pub mod input;
pub mod output;
pub mod stt;

pub use input::SpeechInput;
pub use output::SpeechOutput;
pub use stt::SpeechToText;
