use crate::lookup::Api;

use hyper::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("{api} returned non-success status code: {status}")]
    NonSuccess { api: Api, status: StatusCode },
    #[error("{0} did not answer in time")]
    Timeout(Api),
    #[error("{0} returned no usable coordinates")]
    MissingCoordinates(Api),
    #[error("{api} returned malformed JSON: {error}")]
    InvalidJson { api: Api, error: serde_json::Error },
    #[error(transparent)]
    Hyper(#[from] hyper::Error),
    #[error(transparent)]
    Http(#[from] hyper::http::Error),
}
