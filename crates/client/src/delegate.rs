//! The contract a request-performing client satisfies.
//!
//! The cache layer and the browser both drive a [`Delegate`]. Taking
//! `&mut self` keeps every implementation to one request in flight.

use std::time::Duration;

use async_trait::async_trait;
use replay_core::Error;
use serde::{Serialize, de::DeserializeOwned};

use crate::http::{Request, Response};

/// Per-call arguments passed through to the delegate untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Overrides the delegate's configured timeout for this request.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout: Some(timeout) }
    }
}

/// Something that performs one HTTP exchange.
#[async_trait]
pub trait Delegate: Send {
    /// Perform `request` and return the response.
    ///
    /// Responses may still carry a live body; callers that need the bytes
    /// call [`Response::materialize`].
    async fn perform_request(&mut self, request: &Request, options: &RequestOptions) -> Result<Response, Error>;
}

#[async_trait]
impl<D: Delegate + ?Sized> Delegate for Box<D> {
    async fn perform_request(&mut self, request: &Request, options: &RequestOptions) -> Result<Response, Error> {
        (**self).perform_request(request, options).await
    }
}

/// A delegate that can be built from its own configuration value.
///
/// Wrappers forward this value unmodified.
pub trait FromConfig: Sized {
    type Config: Serialize + DeserializeOwned + Default + Send;

    fn from_config(config: Self::Config) -> Result<Self, Error>;
}
