use thiserror::Error;

#[derive(Debug, Error)]
pub enum OximeterError {
    #[error("sensor could not be opened: {0}")]
    SensorInit(String),
    #[error("frame capture failed: {0}")]
    Capture(String),
    #[error("sensor handle has been released")]
    SensorReleased,
    #[error("failed to encode ROI image: {0}")]
    Encode(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error("frame rate must be greater than zero")]
    InvalidFrameRate,
    #[error("buffer size must be at least 2 samples, got {0}")]
    InvalidBufferSize(usize),
    #[error("smoothing window must be between 1 and the buffer size, got {0}")]
    InvalidWindow(usize),
    #[error("{name} clamp range is inverted: {min} > {max}")]
    InvalidClamp { name: &'static str, min: i32, max: i32 },
    #[error("{name} must be a finite, non-negative number of seconds")]
    InvalidDuration { name: &'static str },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for OximeterError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        OximeterError::Plot(format!("{value:?}"))
    }
}

impl From<image::ImageError> for OximeterError {
    fn from(value: image::ImageError) -> Self {
        OximeterError::Encode(value.to_string())
    }
}
