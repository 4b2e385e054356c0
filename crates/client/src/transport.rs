//! HTTP transport seam.

use futures::future::BoxFuture;

/// Executes a fully built request.
///
/// Implemented for [`reqwest::Client`]; tests substitute a scripted
/// transport to control response timing.
pub trait Transport: Send + Sync {
    /// Send the request and return the raw response, whatever its status.
    fn execute(
        &self,
        request: reqwest::Request,
    ) -> BoxFuture<'static, Result<reqwest::Response, reqwest::Error>>;
}

impl Transport for reqwest::Client {
    fn execute(
        &self,
        request: reqwest::Request,
    ) -> BoxFuture<'static, Result<reqwest::Response, reqwest::Error>> {
        let client = self.clone();
        Box::pin(async move { client.execute(request).await })
    }
}
