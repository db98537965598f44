use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlerterError {
    #[error("Observation store error: {0}")]
    Store(#[from] store::StoreError),
}
