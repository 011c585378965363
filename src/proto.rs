use self::response::Response;

pub mod codec;
pub mod command;
pub mod response;

#[cfg(test)]
pub mod fake;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("I/O error: {:?}", _0)]
    Io(#[from] std::io::Error),

    #[error("Serial I/O error: {:?}", _0)]
    Serial(#[from] tokio_serial::Error),

    #[error("Syntax error")]
    SyntaxError,
    #[error("Execution error")]
    ExecutionError,
    #[error("Synchronization error")]
    SynchronizationError,
    #[error("Communications error")]
    CommunicationsError,
    #[error("Unknown acknowledge: {:?}", _0)]
    UnknownAcknowledge(char),
    #[error("No reply from device")]
    NoReply,
    #[error("Connection was closed")]
    Abort,
    #[error("Screendump exceeds {} bytes", _0)]
    DumpOverflow(usize),
    #[error("Unexpected response: {:?}", _0)]
    Unexpected(Response),
}

impl From<Response> for ProtoError {
    fn from(value: Response) -> Self {
        match value {
            Response::SyntaxError => Self::SyntaxError,
            Response::ExecutionError => Self::ExecutionError,
            Response::SynchronizationError => Self::SynchronizationError,
            Response::CommunicationsError => Self::CommunicationsError,
            Response::Success(_) => Self::Unexpected(value),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProtoError>;
