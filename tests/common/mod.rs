//! Scripted collaborators for exercising the interaction loop

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use seer::{Captioner, Error, Listener, Result, Speaker};

/// Replays a fixed sequence of commands, then silence forever
pub struct ScriptedListener {
    commands: VecDeque<String>,
}

impl ScriptedListener {
    #[must_use]
    pub fn new(commands: &[&str]) -> Self {
        Self {
            commands: commands.iter().map(ToString::to_string).collect(),
        }
    }
}

#[async_trait(?Send)]
impl Listener for ScriptedListener {
    async fn listen(&mut self) -> String {
        self.commands.pop_front().unwrap_or_default()
    }
}

/// Records everything spoken, in order
pub struct RecordingSpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl RecordingSpeaker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            spoken: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle to the transcript, usable after the loop consumed `self`
    #[must_use]
    pub fn transcript(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.spoken)
    }
}

impl Default for RecordingSpeaker {
    fn default() -> Self {
        Self::new()
    }
}

impl Speaker for RecordingSpeaker {
    fn speak(&mut self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Fails every utterance, for exercising the log-and-continue path
pub struct FailingSpeaker;

impl Speaker for FailingSpeaker {
    fn speak(&mut self, _text: &str) -> Result<()> {
        Err(Error::Tts("synthesis failed: device gone".to_string()))
    }
}

/// Returns a canned result and counts how often it was asked
pub struct FakeCaptioner {
    result: std::result::Result<String, String>,
    calls: Arc<Mutex<usize>>,
}

impl FakeCaptioner {
    #[must_use]
    pub fn with_caption(caption: &str) -> Self {
        Self {
            result: Ok(caption.to_string()),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    #[must_use]
    pub fn with_missing_file() -> Self {
        Self {
            result: Err(String::new()),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    #[must_use]
    pub fn call_count(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.calls)
    }
}

impl Captioner for FakeCaptioner {
    fn describe(&mut self, image_path: &Path) -> Result<String> {
        *self.calls.lock().unwrap() += 1;
        match &self.result {
            Ok(caption) => Ok(caption.clone()),
            Err(_) => Err(Error::ImageNotFound(image_path.to_path_buf())),
        }
    }
}
