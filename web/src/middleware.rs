//! Request ids for following a checkout or webhook delivery through the logs.
//!
//! A caller may send its own id in `X-Correlation-ID`; anything that is not
//! a UUID is replaced with a fresh one. Handlers read the id through the
//! [`CorrelationId`](crate::extractors::CorrelationId) extractor. Log lines
//! of the request sit under an `http_request` span carrying the id, which
//! the response echoes back.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/api/products", get(list_products))
//!     .layer(correlation_id_layer());
//! ```

use axum::{extract::Request, http::HeaderValue, response::Response};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Request and response header holding the request id.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Tag every request with an id and open its `http_request` span.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// [`Layer`] returned by [`correlation_id_layer`].
#[derive(Clone, Copy, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Wraps the router; see the module docs.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

type ResponseFuture<E> = Pin<Box<dyn Future<Output = Result<Response, E>> + Send>>;

fn incoming_id(req: &Request) -> Option<Uuid> {
    let header = req.headers().get(CORRELATION_ID_HEADER)?;
    Uuid::parse_str(header.to_str().ok()?).ok()
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let id = incoming_id(&req).unwrap_or_else(Uuid::new_v4);
        req.extensions_mut().insert(id);

        // Path only: query strings may carry admin filters.
        let span = tracing::info_span!(
            "http_request",
            correlation_id = %id,
            method = %req.method(),
            path = %req.uri().path(),
            status = tracing::field::Empty,
        );
        let handled = self.inner.call(req).instrument(span.clone());

        Box::pin(async move {
            let mut response = handled.await?;
            span.record("status", response.status().as_u16());
            if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::extractors::CorrelationId;
    use axum::{body::Body, routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|CorrelationId(id): CorrelationId| async move { id.to_string() }),
            )
            .layer(correlation_id_layer())
    }

    async fn call(header: Option<&str>) -> (String, String) {
        let mut builder = axum::http::Request::builder().uri("/echo");
        if let Some(value) = header {
            builder = builder.header(CORRELATION_ID_HEADER, value);
        }
        let response = app().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let echoed = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (echoed, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_handler_sees_the_echoed_id() {
        let (header, body) = call(None).await;
        assert!(Uuid::parse_str(&header).is_ok());
        assert_eq!(header, body);
    }

    #[tokio::test]
    async fn test_valid_request_id_is_kept() {
        let id = Uuid::new_v4().to_string();
        let (header, body) = call(Some(&id)).await;
        assert_eq!(header, id);
        assert_eq!(body, id);
    }

    #[tokio::test]
    async fn test_invalid_request_id_is_replaced() {
        let (header, _) = call(Some("not-a-uuid")).await;
        assert_ne!(header, "not-a-uuid");
        assert!(Uuid::parse_str(&header).is_ok());
    }
}
