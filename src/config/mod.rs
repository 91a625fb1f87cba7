//! Configuration — settings structs, TOML persistence, platform paths.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, AudioConfig, FallbackConfig, GenerationConfig, StoreConfig, TranscriptionConfig,
};
