use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("could not read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid weather config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("unknown weather '{0}'")]
    UnknownWeather(String),
}
