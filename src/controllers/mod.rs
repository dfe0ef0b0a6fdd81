//! Controller wiring between reconcilers and `kube::runtime`

pub mod backoff;
pub mod predicate;

use std::sync::Arc;
use std::time::Instant;

use futures::{StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::controller::{self, Action, Controller};
use kube::api::DynamicObject;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::{reflector, watcher, WatchStreamExt};
use kube::Api;
use tracing::{debug, error, info, warn};

use crate::metrics::prometheus::{RECONCILE_DURATION, RECONCILIATIONS, RECONCILIATION_ERRORS};
use crate::reconcilers::{ReconcileRequest, Reconciler};
use crate::Error;

pub use backoff::RequeueBackoff;
pub use predicate::EventFilter;

/// How a reconciler is registered with the runtime
pub struct ControllerOptions<K> {
    /// Concurrent reconciles; the runtime default when unset
    pub concurrency: Option<u16>,
    /// Filter applied to watch events before they reach the queue
    pub filter: EventFilter<K>,
    /// Also requeue the owner when one of its Pods changes
    pub owns_pods: Option<Api<Pod>>,
}

impl<K> Default for ControllerOptions<K> {
    fn default() -> Self {
        Self {
            concurrency: None,
            filter: EventFilter::default(),
            owns_pods: None,
        }
    }
}

impl<K> ControllerOptions<K> {
    pub fn concurrency(mut self, workers: u16) -> Self {
        self.concurrency = Some(workers);
        self
    }

    pub fn filter(mut self, filter: EventFilter<K>) -> Self {
        self.filter = filter;
        self
    }

    pub fn owns_pods(mut self, pods: Api<Pod>) -> Self {
        self.owns_pods = Some(pods);
        self
    }
}

/// Shared state handed to every reconcile invocation
pub struct ControllerContext<R> {
    pub reconciler: R,
    pub backoff: RequeueBackoff,
}

/// Run `reconciler` against objects from `api` until shutdown
pub async fn run<R: Reconciler>(api: Api<R::Kind>, reconciler: R, options: ControllerOptions<R::Kind>) {
    info!(
        kind = R::KIND,
        concurrency = options.concurrency,
        "Starting {} controller",
        R::KIND
    );

    let (reader, writer) = reflector::store();
    let filter = options.filter;
    let trigger = watcher(api, watcher::Config::default().any_semantic())
        .default_backoff()
        .reflect(writer)
        .try_filter_map(move |event| {
            let admitted = filter.admit(event);
            async move { Ok(admitted) }
        });

    let mut config = controller::Config::default();
    if let Some(workers) = options.concurrency {
        config = config.concurrency(workers);
    }

    let mut controller = Controller::for_stream(trigger, reader).with_config(config);
    if let Some(pods) = options.owns_pods {
        controller = controller.owns(pods, watcher::Config::default());
    }

    let ctx = Arc::new(ControllerContext {
        reconciler,
        backoff: RequeueBackoff::default(),
    });

    let deleted_ctx = ctx.clone();
    controller
        .shutdown_on_signal()
        .run(reconcile::<R>, error_policy::<R>, ctx)
        .for_each(|res| {
            let ctx = deleted_ctx.clone();
            async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled {}", obj),
                    Err(controller::Error::ObjectNotFound(obj)) => {
                        reconcile_deleted::<R>(&request_for_missing(&obj), &ctx).await
                    }
                    Err(e) => warn!("Reconcile failed: {}", e),
                }
            }
        })
        .await;

    info!("{} controller stopped", R::KIND);
}

async fn reconcile<R: Reconciler>(
    obj: Arc<R::Kind>,
    ctx: Arc<ControllerContext<R>>,
) -> Result<Action, Error> {
    let request = ReconcileRequest::from_object(obj.as_ref());
    let result = reconcile_request::<R>(&request, &ctx).await;
    if result.is_ok() {
        ctx.backoff.reset(&request.to_string());
    }
    result
}

/// Request for an object the runtime dequeued after it left the cache
pub fn request_for_missing(obj: &ObjectRef<DynamicObject>) -> ReconcileRequest {
    ReconcileRequest::new(obj.namespace.clone().unwrap_or_default(), obj.name.clone())
}

/// Reconcile an object that was deleted while queued. The reconciler sees the
/// request and observes the not-found itself. No retry is scheduled.
async fn reconcile_deleted<R: Reconciler>(request: &ReconcileRequest, ctx: &ControllerContext<R>) {
    debug!("Queued {} {} is no longer cached", R::KIND, request);
    if let Ok(action) = reconcile_request::<R>(request, ctx).await {
        debug!("Reconciled deleted {} {}: {:?}", R::KIND, request, action);
    }
    ctx.backoff.forget(&request.to_string());
}

async fn reconcile_request<R: Reconciler>(
    request: &ReconcileRequest,
    ctx: &ControllerContext<R>,
) -> Result<Action, Error> {
    let start = Instant::now();

    RECONCILIATIONS.with_label_values(&[R::KIND]).inc();

    let result = ctx.reconciler.reconcile(request).await;

    let duration = start.elapsed().as_secs_f64();
    RECONCILE_DURATION
        .with_label_values(&[R::KIND])
        .observe(duration);

    match &result {
        Ok(_) => debug!("Reconciled {} {} in {:.3}s", R::KIND, request, duration),
        Err(e) => {
            RECONCILIATION_ERRORS.with_label_values(&[R::KIND]).inc();
            error!("Failed to reconcile {} {}: {}", R::KIND, request, e);
        }
    }

    result
}

fn error_policy<R: Reconciler>(obj: Arc<R::Kind>, err: &Error, ctx: Arc<ControllerContext<R>>) -> Action {
    let request = ReconcileRequest::from_object(obj.as_ref());

    match ctx.backoff.next_delay(&request.to_string()) {
        Some(delay) => {
            warn!(
                "Requeueing {} {} in {:?} after error: {}",
                R::KIND,
                request,
                delay,
                err
            );
            Action::requeue(delay)
        }
        None => {
            warn!("Giving up on {} {} until it changes: {}", R::KIND, request, err);
            Action::await_change()
        }
    }
}
