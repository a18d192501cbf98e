pub mod metronome_config;
pub mod paths;

pub use metronome_config::{
    APP_NAME, ConfigLoadError, DiagnosticsConfig, LoggingConfig, MetronomeConfig, TimingConfig,
};
pub use paths::ProjectPaths;
