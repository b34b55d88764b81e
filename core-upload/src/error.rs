use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Media item {item_id} not found")]
    ItemNotFound { item_id: String },

    #[error("Invalid status transition for {item_id}: {from} -> {to}")]
    InvalidStatus {
        item_id: String,
        from: String,
        to: String,
    },

    #[error("Transfer error: {0}")]
    Transfer(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, UploadError>;
