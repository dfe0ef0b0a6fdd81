//! Admission webhook serving
//!
//! Handlers are registered by path in a [`WebhookRegistry`]. [`route`] turns
//! one HTTP request into an AdmissionReview response without touching the
//! network, and [`serve`] runs it behind the shared HTTP/1 listener.
//!
//! The listener speaks plain HTTP. The API server only calls webhooks over
//! HTTPS, so a deployment puts a TLS-terminating sidecar or proxy in front of
//! the webhook port and points the webhook configuration's `caBundle` at it.

pub mod pod_annotator;

use std::collections::HashMap;
use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use kube::api::DynamicObject;
use kube::core::admission::{
    AdmissionRequest, AdmissionResponse, AdmissionReview, ConvertAdmissionReviewError,
};
use tracing::{debug, error, warn};

use crate::http::{self, Body};
use crate::metrics::prometheus::ADMISSION_REQUESTS;

pub use pod_annotator::{PodAnnotator, MUTATE_POD_PATH};

/// Business logic for one admission webhook path
pub trait AdmissionHandler: Send + Sync {
    fn handle(&self, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse;
}

/// Admission handlers keyed by request path
#[derive(Default, Clone)]
pub struct WebhookRegistry {
    handlers: HashMap<String, Arc<dyn AdmissionHandler>>,
}

impl WebhookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` at `path`, replacing any handler already there
    pub fn register(&mut self, path: impl Into<String>, handler: impl AdmissionHandler + 'static) {
        self.handlers.insert(path.into(), Arc::new(handler));
    }

    pub fn get(&self, path: &str) -> Option<&Arc<dyn AdmissionHandler>> {
        self.handlers.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

/// Answer one webhook HTTP request
pub fn route(registry: &WebhookRegistry, method: &Method, path: &str, body: &[u8]) -> Response<Body> {
    let Some(handler) = registry.get(path) else {
        return http::text(StatusCode::NOT_FOUND, "Not Found");
    };
    if method != Method::POST {
        return http::text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    }

    let request = match decode_review(body) {
        Ok(request) => request,
        Err(message) => {
            warn!(path, "Malformed admission review: {}", message);
            ADMISSION_REQUESTS.with_label_values(&[path, "invalid"]).inc();
            return review_response(StatusCode::BAD_REQUEST, AdmissionResponse::invalid(message));
        }
    };

    let response = handler.handle(&request);
    let outcome = if response.allowed { "allowed" } else { "denied" };
    debug!(path, uid = %request.uid, outcome, "Admission request handled");
    ADMISSION_REQUESTS.with_label_values(&[path, outcome]).inc();

    review_response(StatusCode::OK, response)
}

fn decode_review(body: &[u8]) -> Result<AdmissionRequest<DynamicObject>, String> {
    let review: AdmissionReview<DynamicObject> =
        serde_json::from_slice(body).map_err(|e| e.to_string())?;
    let request: Result<AdmissionRequest<DynamicObject>, ConvertAdmissionReviewError> =
        review.try_into();
    request.map_err(|_| "admission review has no request".to_string())
}

fn review_response(status: StatusCode, response: AdmissionResponse) -> Response<Body> {
    match serde_json::to_vec(&response.into_review()) {
        Ok(body) => http::response(status, Some("application/json"), body),
        Err(e) => {
            error!("Failed to encode admission review: {}", e);
            http::text(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode admission review")
        }
    }
}

/// Start the webhook HTTP server
///
/// Plain HTTP/1 only. TLS must be terminated in front of `port`.
pub async fn serve(port: u16, registry: WebhookRegistry) -> anyhow::Result<()> {
    let registry = Arc::new(registry);

    http::serve("Webhook", port, move |req: Request<Incoming>| {
        let registry = registry.clone();
        async move {
            let (parts, body) = req.into_parts();
            match body.collect().await {
                Ok(body) => route(&registry, &parts.method, parts.uri.path(), &body.to_bytes()),
                Err(e) => {
                    warn!("Failed to read webhook request body: {}", e);
                    http::text(StatusCode::BAD_REQUEST, "Failed to read request body")
                }
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AllowAll;

    impl AdmissionHandler for AllowAll {
        fn handle(&self, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
            AdmissionResponse::from(request)
        }
    }

    fn registry() -> WebhookRegistry {
        let mut registry = WebhookRegistry::new();
        registry.register("/allow", AllowAll);
        registry
    }

    #[test]
    fn unknown_path_is_not_found() {
        let resp = route(&registry(), &Method::POST, "/mutate-v1-deployment", b"{}");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn get_is_method_not_allowed() {
        let resp = route(&registry(), &Method::GET, "/allow", b"");
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn garbage_body_is_bad_request() {
        let resp = route(&registry(), &Method::POST, "/allow", b"not a review");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn review_without_request_is_bad_request() {
        let body = br#"{"apiVersion":"admission.k8s.io/v1","kind":"AdmissionReview"}"#;
        let resp = route(&registry(), &Method::POST, "/allow", body);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn review_with_request_reaches_handler() {
        let body = br#"{
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "kind": {"group": "", "version": "v1", "kind": "Pod"},
                "resource": {"group": "", "version": "v1", "resource": "pods"},
                "name": "web",
                "namespace": "default",
                "operation": "CREATE",
                "userInfo": {"username": "admin"},
                "object": {"apiVersion": "v1", "kind": "Pod", "metadata": {"name": "web"}},
                "dryRun": false
            }
        }"#;
        let resp = route(&registry(), &Method::POST, "/allow", body);
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn registry_lists_paths() {
        let registry = registry();
        assert!(!registry.is_empty());
        assert_eq!(registry.paths().collect::<Vec<_>>(), vec!["/allow"]);
        assert!(WebhookRegistry::new().is_empty());
    }
}
