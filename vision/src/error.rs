use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    OpenCV(#[from] opencv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("failed to parse {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    ConfigWrite(#[from] toml::ser::Error),
    #[error("camera {device}: {reason}")]
    Camera { device: i32, reason: String },
    #[error("telemetry: {0}")]
    Telemetry(String),
    #[error("no tracking mode selected")]
    NoMode,
}
