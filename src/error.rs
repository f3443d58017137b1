use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::transaction::{Amount, Balance};

/// Every way the ledger core can refuse a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: Balance, requested: Amount },

    #[error("invalid block: {0}")]
    InvalidBlock(String),

    #[error("invalid chain at block #{index}: {reason}")]
    InvalidChain { index: usize, reason: String },

    #[error("candidate chain has {candidate} blocks, current has {current}; only a strictly longer chain is adopted")]
    ChainNotLonger { candidate: usize, current: usize },

    #[error("mining failed: {0}")]
    MiningFailed(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Failures at the peer boundary. None of them touch the ledger.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("unknown message prefix in {0:?}")]
    UnknownPrefix(String),

    #[error("malformed transaction payload: {0}")]
    MalformedTransaction(#[from] serde_json::Error),

    #[error("peer {peer} unreachable: {source}")]
    Unreachable {
        peer: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("peer {peer} answered {status}")]
    BadStatus { peer: String, status: u16 },
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for LedgerError {
    fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::InvalidChain { .. } | LedgerError::ChainNotLonger { .. } => {
                StatusCode::CONFLICT
            }
            LedgerError::MiningFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
