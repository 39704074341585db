//! Error types for configuration, rendering, and the application shell.

/// Invalid or unreadable planet/scene configuration. Raised at load time,
/// never from inside the per-pixel loop.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write a config file.
    #[error("config I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse or serialize JSON.
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Rotation axis letter other than x, y or z.
    #[error("rotation around the {0:?} axis is not supported, use x, y or z")]
    UnsupportedAxis(char),

    /// A band table with no entries.
    #[error("band table `{table}` is empty")]
    EmptyBands { table: String },

    /// Thresholds must strictly increase in table order.
    #[error("band `{band}` threshold {threshold} does not exceed the previous {previous}")]
    UnorderedBands {
        band: String,
        threshold: f64,
        previous: f64,
    },

    /// The last band must be an unbounded catch-all.
    #[error("last band `{band}` has finite threshold {threshold}, expected an unbounded catch-all")]
    MissingCatchAll { band: String, threshold: f64 },

    /// Level-of-detail octave table is malformed.
    #[error("level of detail: {0}")]
    LevelOfDetail(String),

    /// A numeric parameter outside its allowed range.
    #[error("{field} = {value} is out of range ({expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
}

/// A frame that could not be rendered. The caller decides whether to retry
/// on the next frame or stop.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The chunk worker pool could not be created.
    #[error("failed to build render thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A chunk worker panicked; the whole frame is discarded.
    #[error("render chunk ({x0}, {y0})..({x1}, {y1}) panicked: {message}")]
    ChunkPanicked {
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        message: String,
    },
}

/// Top-level error for the binary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// SDL reports errors as plain strings.
    #[error("display error: {0}")]
    Display(String),

    #[error("failed to write snapshot {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode snapshot: {0}")]
    Png(#[from] png::EncodingError),
}
