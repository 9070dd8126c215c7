use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("OpenCV Error: {0}")]
    OpenCvError(#[from] opencv::Error),

    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config Error: {0}")]
    ConfigError(#[from] serde_json::Error),

    #[error("Shape Error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),

    #[error("unable to open video source {0:?}")]
    SourceUnavailable(String),

    #[error("unable to open video sink {0:?}")]
    SinkUnavailable(String),

    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    #[error("class id {0} is not in the label table")]
    UnknownClass(i32),

    #[error("empty label table")]
    EmptyLabels,

    #[error("frame is {got:?}, stream is {expected:?}")]
    GeometryMismatch {
        expected: (i32, i32),
        got: (i32, i32),
    },

    #[error("fourcc must be 1 to 4 ASCII letters, digits or spaces, got {0:?}")]
    InvalidFourcc(String),

    #[error("no answer given for {0:?}")]
    EmptyAnswer(&'static str),
}
