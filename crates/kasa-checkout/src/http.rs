//! # HTTP Backend
//!
//! REST implementation of the order, fiscal and payment collaborators.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST   {base}/orders              create order                        │
//! │  DELETE {base}/orders/{id}         compensating delete                 │
//! │  GET    {base}/fiscal/devices      list fiscal devices                 │
//! │  POST   {base}/fiscal/receipts     send fiscal receipt                 │
//! │  POST   {base}/payments/orders     open gateway order                  │
//! │  POST   {base}/payments/verify     verify gateway payment              │
//! │                                                                         │
//! │  Authorization: Bearer <token>     (when a token is configured)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call is made once. No retries and no client-side timeout beyond
//! what the transport itself enforces.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use kasa_core::Order;

use crate::config::ApiSettings;
use crate::error::{RemoteError, RemoteResult};
use crate::remote::{
    FiscalAck, FiscalDevice, FiscalReceiptRequest, FiscalService, GatewayOrder,
    GatewayOrderRequest, NewOrder, OrderService, PaymentConfirmation, PaymentGateway,
    PaymentVerification,
};

/// Longest raw body echoed into an error message.
const MAX_ERROR_BODY: usize = 200;

/// Talks to the POS backend over JSON/HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpBackend {
    /// Creates a backend from the API settings.
    pub fn new(settings: &ApiSettings) -> RemoteResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("kasa-pos/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(client, settings)
    }

    /// Creates a backend that shares an existing client.
    pub fn with_client(client: Client, settings: &ApiSettings) -> RemoteResult<Self> {
        let mut base = settings.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl(base));
        }

        Ok(HttpBackend {
            client,
            base_url,
            token: settings.token.clone(),
        })
    }

    /// Replaces the session token (e.g. after the cashier signs in again).
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> RemoteResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| RemoteError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> RemoteResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, "Backend request");

        let req = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> RemoteResult<T> {
        let req = self.request(Method::GET, segments)?;
        Self::read_json(req).await
    }

    async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> RemoteResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let req = self.request(Method::POST, segments)?.json(body);
        Self::read_json(req).await
    }

    async fn read_json<T: DeserializeOwned>(req: RequestBuilder) -> RemoteResult<T> {
        let resp = check_status(req.send().await?).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Maps non-success responses onto [`RemoteError`].
async fn check_status(resp: Response) -> RemoteResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(RemoteError::Unauthorized {
            status: status.as_u16(),
        });
    }

    let body = match resp.text().await {
        Ok(body) => body,
        Err(e) => {
            debug!(status = %status, error = %e, "Failed to read error body");
            String::new()
        }
    };
    Err(RemoteError::Api {
        status: status.as_u16(),
        message: error_message(&body, status),
    })
}

/// Pulls a readable message out of an error body.
///
/// Backends answer `{"message": ..}`, `{"error": ..}` or `{"detail": ..}`;
/// anything else is echoed (truncated) or replaced by the status reason.
fn error_message(body: &str, status: StatusCode) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error", "detail"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|m| m.as_str()).map(str::to_string))
        });

    from_json
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.chars().take(MAX_ERROR_BODY).collect())
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string())
}

// =============================================================================
// Collaborator Implementations
// =============================================================================

#[async_trait]
impl OrderService for HttpBackend {
    async fn create_order(&self, order: &NewOrder) -> RemoteResult<Order> {
        self.post_json(&["orders"], order).await
    }

    async fn delete_order(&self, order_id: &str) -> RemoteResult<()> {
        let req = self.request(Method::DELETE, &["orders", order_id])?;
        check_status(req.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl FiscalService for HttpBackend {
    async fn list_devices(&self) -> RemoteResult<Vec<FiscalDevice>> {
        self.get_json(&["fiscal", "devices"]).await
    }

    async fn send_receipt(&self, receipt: &FiscalReceiptRequest) -> RemoteResult<FiscalAck> {
        self.post_json(&["fiscal", "receipts"], receipt).await
    }
}

#[async_trait]
impl PaymentGateway for HttpBackend {
    async fn create_gateway_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> RemoteResult<GatewayOrder> {
        self.post_json(&["payments", "orders"], request).await
    }

    async fn verify_payment(
        &self,
        verification: &PaymentVerification,
    ) -> RemoteResult<PaymentConfirmation> {
        self.post_json(&["payments", "verify"], verification).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
