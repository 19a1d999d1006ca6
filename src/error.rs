//! Run-level error types.
//!
//! Row rejection and null coercion are not errors; everything here aborts the
//! run of the indicator it occurred in, and only that run.

use std::time::Duration;
use thiserror::Error;

/// Page renderer failures.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Content-ready condition never held within the timeout
    #[error("`{selector}` did not appear on {url} within {timeout:?}")]
    Timeout {
        url: String,
        selector: String,
        timeout: Duration,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid ready selector `{0}`")]
    Selector(String),
}

/// The target table is missing from the rendered page (site layout change).
#[derive(Error, Debug)]
#[error("no table matches {selector}")]
pub struct TableNotFound {
    pub selector: String,
}

/// A record does not carry exactly the dataset's fields.
#[derive(Error, Debug)]
#[error("record {index} has fields [{found}], expected [{expected}]")]
pub struct SchemaViolation {
    pub index: usize,
    pub expected: String,
    pub found: String,
}

/// Object store failures. The write did not complete.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("upload of {key} failed: {source}")]
    Http {
        key: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upload of {key} rejected with HTTP {status}: {body}")]
    Status { key: String, status: u16, body: String },

    #[error("writing {key} failed: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not obtain GCS credentials: {0}")]
    Auth(#[from] gcp_auth::Error),

    #[error("storage misconfigured: {0}")]
    Config(String),
}

/// Any failure that ends an indicator run.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    TableNotFound(#[from] TableNotFound),

    #[error(transparent)]
    Schema(#[from] SchemaViolation),

    #[error("dataset could not be encoded: {0}")]
    Encode(#[from] csv::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
