use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("action {action} is outside the action space of size {n}")]
    InvalidAction { action: usize, n: usize },
    #[error("cannot call step before reset")]
    ResetNeeded,
    #[error("expected {expected} actions for the vectorized env, got {got}")]
    ActionCount { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum TaxiPpoError {
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error("model recorder failed: {0}")]
    Recorder(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("rollout memory is empty")]
    EmptyRollout,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, TaxiPpoError>;
