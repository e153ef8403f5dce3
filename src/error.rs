//! Tipos de erro do roundtrip.
//!
//! Cada fronteira com o serviço remoto tem o seu próprio enum derivado com
//! `thiserror`: submissão de importação, polling de jobs e acesso a recursos.
//! Erros de estágio viram resultados da verificação; apenas [`SetupError`]
//! aborta a execução inteira.

use thiserror::Error;

/// The service refused an artifact at ingestion.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// O servidor respondeu com um status diferente de sucesso.
    #[error("import rejected (status {status}): {body}")]
    Rejected { status: u16, body: String },

    /// Falha de rede antes de obter resposta.
    #[error("import submission failed: {0}")]
    Transport(String),

    #[error("cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for SubmissionError {
    fn from(err: reqwest::Error) -> Self {
        SubmissionError::Transport(err.to_string())
    }
}

/// Errors raised while waiting for an import job to leave `inprogress`.
#[derive(Debug, Error)]
pub enum PollError {
    /// Status checks kept failing after the bounded number of attempts.
    #[error("job status unavailable after {attempts} attempts: {message}")]
    Transport { attempts: u32, message: String },

    #[error("job did not reach a terminal phase within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("cancelled")]
    Cancelled,
}

/// Non-success response or transport failure on a resource call.
///
/// The raw body of a non-success response is kept verbatim: it is the only
/// evidence available when the service's error format is opaque.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{status} {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a success status but an unreadable body.
    #[error("undecodable response: {0}")]
    Decode(String),

    /// The request body could not be serialized; nothing was sent.
    #[error("unserializable request: {0}")]
    Encode(String),

    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    /// HTTP status of the failed call, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw diagnostic body, exactly as the server sent it.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            FetchError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

/// Failures fatal to the whole run.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("none of the {attempted} artifacts could be submitted")]
    NothingSubmitted { attempted: usize },

    #[error("import of {artifact} ended in phase {phase}")]
    ImportFailed { artifact: String, phase: String },

    #[error("cannot enumerate resources under {folder}: {source}")]
    Enumerate {
        folder: String,
        #[source]
        source: FetchError,
    },

    #[error("login failed: {0}")]
    Login(String),

    #[error("run cancelled before verification started")]
    Cancelled,
}
