//! The interaction loop: classify spoken commands and drive the collaborators
//!
//! The loop is strictly sequential: listen, classify, act, speak, repeat. The
//! collaborators are injected behind traits so the loop logic can be exercised
//! with scripted stand-ins.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::Result;
use crate::speech::{SpeechInput, SpeechOutput};
use crate::vision::BlipCaptioner;

/// Spoken once at startup
pub const GREETING: &str =
    "Hello. I am an AI that can see and hear. Say 'describe the image' to begin.";

/// Spoken before captioning starts
pub const ACKNOWLEDGE: &str = "Okay, I am looking at the image now.";

/// Spoken on exit
pub const FAREWELL: &str = "Goodbye!";

/// Spoken for commands that match nothing
pub const FALLBACK: &str =
    "I'm not sure how to respond to that. Please say 'describe the image'.";

/// What a recognized command asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Caption the configured image
    Describe,
    /// End the session
    Exit,
    /// Recognized words that match no intent
    Unknown,
    /// Nothing usable was heard
    Silence,
}

/// Classify a normalized command string
///
/// The describe intent takes priority over exit, so a phrase containing both
/// keyword sets ("stop describing the image") still triggers a description.
#[must_use]
pub fn classify(command: &str) -> Intent {
    let command = command.trim();

    if command.is_empty() {
        return Intent::Silence;
    }
    if command.contains("describe") && command.contains("image") {
        return Intent::Describe;
    }
    if command.contains("exit") || command.contains("quit") || command.contains("stop") {
        return Intent::Exit;
    }
    Intent::Unknown
}

/// Whether the loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminated,
}

/// Source of spoken commands
#[async_trait(?Send)]
pub trait Listener {
    /// Capture one utterance, returning the empty string on any failure
    async fn listen(&mut self) -> String;
}

/// Sink for spoken responses
pub trait Speaker {
    /// Speak the text, blocking until playback completes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    fn speak(&mut self, text: &str) -> Result<()>;
}

/// Produces captions for images on disk
pub trait Captioner {
    /// Caption the image at `image_path`
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing or inference fails
    fn describe(&mut self, image_path: &Path) -> Result<String>;
}

#[async_trait(?Send)]
impl Listener for SpeechInput {
    async fn listen(&mut self) -> String {
        SpeechInput::listen(self).await
    }
}

impl Speaker for SpeechOutput {
    fn speak(&mut self, text: &str) -> Result<()> {
        SpeechOutput::speak(self, text)
    }
}

impl Captioner for BlipCaptioner {
    fn describe(&mut self, image_path: &Path) -> Result<String> {
        BlipCaptioner::describe(self, image_path)
    }
}

/// The voice assistant loop over injected collaborators
pub struct Assistant<L, S, C> {
    listener: L,
    speaker: S,
    captioner: C,
    image_path: PathBuf,
    state: LoopState,
}

impl<L: Listener, S: Speaker, C: Captioner> Assistant<L, S, C> {
    /// Assemble the loop around its collaborators
    #[must_use]
    pub fn new(listener: L, speaker: S, captioner: C, image_path: PathBuf) -> Self {
        Self {
            listener,
            speaker,
            captioner,
            image_path,
            state: LoopState::Running,
        }
    }

    /// Current loop state
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Greet, then run the listen/act cycle until terminated
    #[allow(clippy::future_not_send)]
    pub async fn run(&mut self) {
        self.say(GREETING);

        while self.state == LoopState::Running {
            let command = self.listener.listen().await;
            self.dispatch(&command);
        }

        tracing::info!("session ended");
    }

    /// Act on one command
    pub fn dispatch(&mut self, command: &str) {
        match classify(command) {
            Intent::Describe => {
                self.say(ACKNOWLEDGE);
                let response = match self.captioner.describe(&self.image_path) {
                    Ok(caption) => caption,
                    Err(e) => {
                        tracing::warn!(error = %e, "captioning failed");
                        e.to_string()
                    }
                };
                self.say(&response);
            }
            Intent::Exit => {
                self.say(FAREWELL);
                self.state = LoopState::Terminated;
            }
            Intent::Unknown => {
                tracing::info!(%command, "command not understood");
                self.say(FALLBACK);
            }
            Intent::Silence => {
                tracing::debug!("nothing heard, listening again");
            }
        }
    }

    /// Speak, logging rather than propagating a mid-session failure
    fn say(&mut self, text: &str) {
        if let Err(e) = self.speaker.speak(text) {
            tracing::warn!(error = %e, "speech output failed");
        }
    }
}
