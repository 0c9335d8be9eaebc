use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Vision(#[from] turret_vision::error::Error),
    #[error("no camera connected")]
    NoCamera,
}
