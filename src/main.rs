//! Application entry point — terminal session runner.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the component graph: microphone source, remote transcriber
//!    (with the on-device fallback when a model is configured and the
//!    `local-fallback` feature is compiled in), API generator, and the
//!    hosted store when one is configured — in-memory otherwise.
//! 4. Drive creation sessions from stdin until the user quits.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use voice_to_pitch::audio::MicSource;
use voice_to_pitch::config::AppConfig;
use voice_to_pitch::pitch::ApiPitchGenerator;
use voice_to_pitch::session::{SessionController, SessionView};
use voice_to_pitch::store::{render_export, MemoryStore, PitchStore, RestStore};
use voice_to_pitch::transcribe::{RemoteTranscriber, Transcriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = AppConfig::load()?;
    log::info!(
        "voice-to-pitch starting (transcription: {}, generation: {})",
        config.transcription.endpoint,
        config.generation.base_url
    );

    let source: Arc<dyn voice_to_pitch::audio::AudioSource> =
        Arc::new(MicSource::new(config.audio.constraints()));
    let transcriber = build_transcriber(&config, Arc::clone(&source));

    let store: Arc<dyn PitchStore> = match RestStore::from_config(&config.store) {
        Some(rest) => Arc::new(rest),
        None => {
            log::info!("no store endpoint configured, keeping pitches in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let controller = SessionController::new(
        source,
        transcriber,
        Arc::new(ApiPitchGenerator::from_config(&config.generation)),
        Arc::clone(&store),
        config.store.owner_id.clone(),
    );

    run_loop(&controller, &store, &config).await;
    Ok(())
}

/// Pick the transcriber capability from config and compiled features.
#[allow(unused_variables)]
fn build_transcriber(
    config: &AppConfig,
    source: Arc<dyn voice_to_pitch::audio::AudioSource>,
) -> Arc<dyn Transcriber> {
    #[cfg(feature = "local-fallback")]
    if let Some(model_path) = &config.fallback.model_path {
        match voice_to_pitch::transcribe::WhisperRecognizer::load(
            model_path,
            &config.fallback.language,
            source,
            config.fallback.listen_secs,
        ) {
            Ok(recognizer) => {
                log::info!("on-device fallback enabled ({})", model_path.display());
                return Arc::new(RemoteTranscriber::with_fallback(
                    &config.transcription,
                    Arc::new(recognizer),
                ));
            }
            Err(e) => log::warn!("fallback model unusable ({e}), continuing remote-only"),
        }
    }

    Arc::new(RemoteTranscriber::remote_only(&config.transcription))
}

/// Read commands from stdin and drive the session state machine.
async fn run_loop(controller: &SessionController, store: &Arc<dyn PitchStore>, config: &AppConfig) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_prompt(controller);

        let Ok(Some(line)) = lines.next_line().await else {
            break;
        };
        let input = line.trim();

        match (controller.view(), input) {
            (_, "q") => break,

            (SessionView::Idle, "") => {
                controller.start_recording();
            }
            (SessionView::Idle, "r") => {
                controller.retry_transcription().await;
            }
            (SessionView::Idle, "l") => {
                print_library(store, &config.store.owner_id).await;
            }

            (SessionView::Recording, _) => {
                controller.stop_recording().await;
                if let Some(transcript) = controller.snapshot().transcript {
                    println!("\n--- transcript ---\n{transcript}\n------------------");
                }
            }

            (SessionView::TranscriptReady, "g" | "") => {
                controller.generate().await;
                if let Some(pitch) = controller.snapshot().generated {
                    println!("\n{}", pitch.one_liner);
                    for (name, value) in pitch.structure.fields() {
                        println!("  [{name}] {value}");
                    }
                }
            }
            (SessionView::TranscriptReady, "d") => {
                controller.rerecord();
            }

            (SessionView::PitchReady, "s" | "") => {
                if let Some(saved) = controller.save().await {
                    println!("saved as {} — export below\n", saved.id);
                    println!("{}", render_export(&saved));
                }
            }
            (SessionView::PitchReady, "x") => {
                controller.discard();
            }

            _ => println!("unrecognised input for this step"),
        }

        print_error(controller);
    }
}

fn print_prompt(controller: &SessionController) {
    let hint = match controller.view() {
        SessionView::Idle if controller.can_retry_transcription() => {
            "[Enter] record  [r] retry transcription  [l] library  [q] quit"
        }
        SessionView::Idle => "[Enter] record  [l] library  [q] quit",
        SessionView::Recording => "[Enter] stop recording",
        SessionView::TranscriptReady => "[Enter/g] generate pitch  [d] re-record",
        SessionView::PitchReady => "[Enter/s] save  [x] discard",
        busy => busy.label(),
    };
    println!("\n({}) {}", controller.view().label(), hint);
}

fn print_error(controller: &SessionController) {
    let snapshot = controller.snapshot();
    if let Some(error) = snapshot.last_error {
        if snapshot.quota_flag {
            println!(
                "! {} — the transcription quota is exhausted; configure the \
                 on-device fallback model to keep working",
                error.message
            );
        } else {
            println!("! {}", error.message);
        }
    }
}

async fn print_library(store: &Arc<dyn PitchStore>, owner_id: &str) {
    match store.list(owner_id).await {
        Ok(pitches) if pitches.is_empty() => println!("library is empty"),
        Ok(pitches) => {
            for p in pitches {
                println!(
                    "{}  {}  [{}]  {}",
                    p.id,
                    p.created_at.format("%Y-%m-%d"),
                    match p.status {
                        voice_to_pitch::store::PitchStatus::Completed => "ready",
                        voice_to_pitch::store::PitchStatus::Processing => "processing",
                    },
                    p.title
                );
            }
        }
        Err(e) => println!("! {e}"),
    }
}
