use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use seer::audio::{AudioCapture, AudioPlayback, rms};
use seer::{Assistant, BlipCaptioner, Config, SpeechInput, SpeechOutput, SpeechToText};

/// Seer - a voice assistant that describes what it sees
#[derive(Parser)]
#[command(name = "seer", version, about)]
struct Cli {
    /// Image to describe (overrides the configured path)
    #[arg(short, long, env = "SEER_IMAGE")]
    image: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test speech synthesis
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Caption an image and print the result
    Caption {
        /// Path to the image
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,seer=info",
        1 => "info,seer=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(),
            Command::TestTts { text } => test_tts(&text),
            Command::Caption { path } => caption(&path),
        };
    }

    let mut config = Config::load()?;
    if let Some(image) = cli.image {
        config.image_path = image;
    }

    tracing::info!(image = %config.image_path.display(), "starting seer");

    // Startup is fail-fast: every collaborator must come up before the loop
    let speaker = SpeechOutput::new(&config.tts)?;
    let captioner = BlipCaptioner::load(&config.caption)?;
    let stt = SpeechToText::new(config.require_api_key()?, config.recognition.model.clone())?;
    let listener = SpeechInput::new(stt);

    let mut assistant = Assistant::new(listener, speaker, captioner, config.image_path);
    assistant.run().await;

    Ok(())
}

/// Test microphone input with a one-line-per-second level readout
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Listening for {duration} seconds; speak into the microphone.\n");

    let mut capture = AudioCapture::open()?;
    capture.start()?;

    for second in 1..=duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.drain();
        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bars = (energy * 200.0).min(40.0) as usize;
        println!("{second:3}s  rms {energy:.4}  peak {peak:.4}  {}", "#".repeat(bars));
    }

    capture.stop();

    println!();
    println!("A level meter that never moves usually means the wrong default");
    println!("input device is selected; check the system sound settings.");

    Ok(())
}

/// Test speaker output with a two-second 440Hz tone
fn test_speaker() -> anyhow::Result<()> {
    println!("Playing a two second test tone...\n");

    let playback = AudioPlayback::open()?;

    let sample_rate = 24_000_u32;
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
        })
        .collect();

    playback.play(&samples, sample_rate)?;

    println!("Silence here usually means the wrong default output device is");
    println!("selected; check the system sound settings.");

    Ok(())
}

/// Test speech synthesis end to end
fn test_tts(text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load()?;
    let mut output = SpeechOutput::new(&config.tts)?;

    println!("Synthesizing and playing...");
    output.speak(text)?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

/// Caption a single image and print the result
fn caption(path: &Path) -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("Loading caption model (first run downloads the weights)...");
    let mut captioner = BlipCaptioner::load(&config.caption)?;

    let text = captioner.describe(path)?;
    println!("{text}");

    Ok(())
}
