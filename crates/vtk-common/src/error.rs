use thiserror::Error;

#[derive(Error, Debug)]
pub enum VtkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("process error: {0}")]
    Spawn(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("terminal state error: {0}")]
    State(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("widget error: {0}")]
    Widget(String),
}

pub type Result<T> = std::result::Result<T, VtkError>;
