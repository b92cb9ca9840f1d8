//! Seer - a voice assistant that describes what it sees
//!
//! This library provides the core functionality for the seer binary:
//! - Speech input (microphone capture + network speech recognition)
//! - Image captioning via a local pretrained vision-language model
//! - Speech output (local synthesis engine + speaker playback)
//! - The interaction loop tying them together
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │               Interaction Loop                  │
//! │   listen → classify → dispatch → speak → loop   │
//! └───────┬───────────────┬───────────────┬─────────┘
//!         │               │               │
//! ┌───────▼──────┐ ┌──────▼──────┐ ┌──────▼───────┐
//! │ Speech Input │ │  Captioner  │ │ Speech Output│
//! │  cpal + STT  │ │ candle BLIP │ │ VITS + cpal  │
//! └──────────────┘ └─────────────┘ └──────────────┘
//! ```
//!
//! All collaborators are owned handles created during startup and injected
//! into the loop; the loop itself holds the only control-flow logic.

pub mod assistant;
pub mod audio;
pub mod config;
pub mod error;
pub mod speech;
pub mod vision;

pub use assistant::{
    Assistant, Captioner, Intent, Listener, LoopState, Speaker, classify,
};
pub use config::Config;
pub use error::{Error, Result};
pub use speech::{SpeechInput, SpeechOutput, SpeechToText};
pub use vision::BlipCaptioner;
