/// Errors an output sink can report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// the sink can't take this sample rate / channel layout
    UnsupportedFormat { sample_rate: u32, channels: usize },
    /// nobody is listening on the other end anymore
    Disconnected,
    /// the consumer didn't make room within the write timeout
    Timeout,
    /// anything the underlying device reports
    Device(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::UnsupportedFormat {
                sample_rate,
                channels,
            } => write!(
                f,
                "unsupported output format: {} Hz, {} channel(s)",
                sample_rate, channels
            ),
            SinkError::Disconnected => write!(f, "output sink disconnected"),
            SinkError::Timeout => write!(f, "output sink stalled, write timed out"),
            SinkError::Device(msg) => write!(f, "output device error: {}", msg),
        }
    }
}

impl std::error::Error for SinkError {}

/// Why `AudioEngine::begin` refused to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    AlreadyRunning,
    Sink(SinkError),
    Spawn(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::AlreadyRunning => write!(f, "audio engine is already running"),
            EngineError::Sink(e) => write!(f, "could not set up audio output: {}", e),
            EngineError::Spawn(msg) => write!(f, "could not start audio thread: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Sink(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SinkError> for EngineError {
    fn from(e: SinkError) -> Self {
        EngineError::Sink(e)
    }
}
