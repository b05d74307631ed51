//! Domain error types.

/// Failure of a pure engine computation.
///
/// Every variant names the offending parameter or series so a caller can
/// tell which instrument or stage failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("series are not aligned on dates: {series}")]
    MisalignedSeries { series: String },

    #[error("{left} and {right} share {common} dates, need at least 2")]
    InsufficientOverlap {
        left: String,
        right: String,
        common: usize,
    },

    #[error("series {series} is empty")]
    EmptySeries { series: String },

    #[error("series {series} has zero variance")]
    DegenerateVariance { series: String },

    #[error("invalid series {series}: {reason}")]
    InvalidSeries { series: String, reason: String },

    #[error("series {series} has {observations} observations, need {minimum}")]
    InsufficientData {
        series: String,
        observations: usize,
        minimum: usize,
    },
}

/// Top-level error type for signalfolio.
#[derive(Debug, thiserror::Error)]
pub enum SignalfolioError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SignalfolioError> for std::process::ExitCode {
    fn from(err: &SignalfolioError) -> Self {
        let code: u8 = match err {
            SignalfolioError::Io(_) | SignalfolioError::Report { .. } => 1,
            SignalfolioError::ConfigParse { .. }
            | SignalfolioError::ConfigMissing { .. }
            | SignalfolioError::ConfigInvalid { .. } => 2,
            SignalfolioError::Data { .. } => 3,
            SignalfolioError::Engine(_) => 4,
            SignalfolioError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
