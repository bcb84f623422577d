//! Security Headers Middleware
//!
//! Helmet-style response headers. The resource policy is `cross-origin` so
//! the mobile app's web views can load API responses; HSTS is sent only in
//! production.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Request, Response},
};
use tower::{Layer, Service};

/// Security headers configuration
#[derive(Clone, Debug)]
pub struct SecurityHeadersConfig {
    /// Send Strict-Transport-Security
    pub enable_hsts: bool,
    pub hsts_max_age: u64,
    pub content_security_policy: String,
    pub cross_origin_resource_policy: String,
    pub referrer_policy: String,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            enable_hsts: false,
            hsts_max_age: 15_552_000,
            content_security_policy: "default-src 'self'; frame-ancestors 'self'; object-src 'none'".into(),
            cross_origin_resource_policy: "cross-origin".into(),
            referrer_policy: "no-referrer".into(),
        }
    }
}

impl SecurityHeadersConfig {
    fn headers(&self) -> Vec<(HeaderName, HeaderValue)> {
        let mut headers = vec![
            (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
            (header::X_XSS_PROTECTION, HeaderValue::from_static("0")),
            (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
        ];

        let configured = [
            (header::CONTENT_SECURITY_POLICY, self.content_security_policy.as_str()),
            (
                HeaderName::from_static("cross-origin-resource-policy"),
                self.cross_origin_resource_policy.as_str(),
            ),
            (header::REFERRER_POLICY, self.referrer_policy.as_str()),
        ];
        for (name, value) in configured {
            match HeaderValue::from_str(value) {
                Ok(value) => headers.push((name, value)),
                Err(_) => tracing::warn!(header = %name, "Ignoring invalid security header value"),
            }
        }

        if self.enable_hsts {
            let hsts = format!("max-age={}; includeSubDomains", self.hsts_max_age);
            if let Ok(value) = HeaderValue::from_str(&hsts) {
                headers.push((header::STRICT_TRANSPORT_SECURITY, value));
            }
        }

        headers
    }
}

/// Layer that adds security headers to responses
#[derive(Clone)]
pub struct SecurityHeadersLayer {
    headers: Arc<Vec<(HeaderName, HeaderValue)>>,
}

impl SecurityHeadersLayer {
    pub fn new(config: &SecurityHeadersConfig) -> Self {
        Self {
            headers: Arc::new(config.headers()),
        }
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersMiddleware {
            inner,
            headers: self.headers.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SecurityHeadersMiddleware<S> {
    inner: S,
    headers: Arc<Vec<(HeaderName, HeaderValue)>>,
}

impl<S> Service<Request<Body>> for SecurityHeadersMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let headers = self.headers.clone();

        Box::pin(async move {
            let mut response = inner.call(request).await?;
            let response_headers = response.headers_mut();
            for (name, value) in headers.iter() {
                response_headers.insert(name.clone(), value.clone());
            }
            Ok(response)
        })
    }
}

/// Security headers for the given environment; HSTS only in production.
pub fn create_security_headers_layer(production: bool) -> SecurityHeadersLayer {
    SecurityHeadersLayer::new(&SecurityHeadersConfig {
        enable_hsts: production,
        ..Default::default()
    })
}
