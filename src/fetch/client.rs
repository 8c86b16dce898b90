use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a prepared HTTP request.
///
/// Every upstream client goes through this trait so that transports can be
/// layered (see [`super::auth::ApiKey`]) or replaced in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
