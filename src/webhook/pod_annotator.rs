//! Pod mutator that stamps a fixed annotation onto every admitted pod

use hyper::StatusCode;
use k8s_openapi::api::core::v1::Pod;
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AdmissionError;
use crate::webhook::AdmissionHandler;

/// Path the pod mutator is registered at
pub const MUTATE_POD_PATH: &str = "/mutate-v1-pod";

/// Annotation key added to every pod
pub const ANNOTATION_KEY: &str = "example-mutating-admission-webhook";

/// Annotation value added to every pod
pub const ANNOTATION_VALUE: &str = "foo";

/// Set the annotation, creating the annotation map if it is unset
pub fn annotate(pod: &mut Pod) {
    pod.metadata
        .annotations
        .get_or_insert_with(Default::default)
        .insert(ANNOTATION_KEY.to_string(), ANNOTATION_VALUE.to_string());
}

/// Decode `raw` as a pod, annotate it, and diff the re-encoded pod before and
/// after. Both sides go through the same encoder, so fields the typed decode
/// normalizes never show up in the patch.
pub fn mutate_pod(raw: &[u8]) -> Result<json_patch::Patch, AdmissionError> {
    mutate_pod_with(raw, |pod| serde_json::to_value(pod))
}

/// [`mutate_pod`] with a caller-supplied pod encoder
pub fn mutate_pod_with<F>(raw: &[u8], encode: F) -> Result<json_patch::Patch, AdmissionError>
where
    F: Fn(&Pod) -> serde_json::Result<Value>,
{
    let mut pod: Pod = serde_json::from_slice(raw).map_err(AdmissionError::Decode)?;
    let original = encode(&pod).map_err(AdmissionError::Encode)?;

    annotate(&mut pod);

    let mutated = encode(&pod).map_err(AdmissionError::Encode)?;
    Ok(json_patch::diff(&original, &mutated))
}

/// Denied response carrying the error's HTTP status
pub fn errored(request: &AdmissionRequest<DynamicObject>, err: &AdmissionError) -> AdmissionResponse {
    errored_with(request, err.status_code(), err.to_string())
}

fn errored_with(
    request: &AdmissionRequest<DynamicObject>,
    status: StatusCode,
    message: String,
) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request).deny(message);
    response.result.code = status.as_u16();
    response
}

/// Admission handler adding [`ANNOTATION_KEY`] to pods
#[derive(Debug, Default, Clone)]
pub struct PodAnnotator;

impl AdmissionHandler for PodAnnotator {
    fn handle(&self, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
        let Some(object) = &request.object else {
            debug!(uid = %request.uid, "No object in admission request, allowing unchanged");
            return AdmissionResponse::from(request);
        };

        let raw = match serde_json::to_vec(object) {
            Ok(raw) => raw,
            Err(e) => return errored(request, &AdmissionError::Encode(e)),
        };

        let patch = match mutate_pod(&raw) {
            Ok(patch) => patch,
            Err(e) => {
                warn!(uid = %request.uid, error = %e, "Rejecting pod admission");
                return errored(request, &e);
            }
        };

        if patch.0.is_empty() {
            debug!(uid = %request.uid, pod = %request.name, "Pod already annotated");
            return AdmissionResponse::from(request);
        }

        debug!(uid = %request.uid, pod = %request.name, ops = patch.0.len(), "Patching pod");
        match AdmissionResponse::from(request).with_patch(patch) {
            Ok(response) => response,
            Err(e) => errored_with(
                request,
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("patch serialization error: {}", e),
            ),
        }
    }
}
