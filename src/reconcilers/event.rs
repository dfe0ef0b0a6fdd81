//! Event observer
//!
//! Watches Events and logs each one it can still read. Delete notifications
//! usually arrive after the object is gone, so a 404 on fetch is the common,
//! successful outcome.

use k8s_openapi::api::core::v1::Event;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, info, instrument};

use crate::client::ObjectClient;
use crate::reconcilers::{ReconcileRequest, Reconciler};
use crate::Result;

/// Reconciler that observes Events without mutating them
pub struct EventReconciler<C> {
    client: C,
}

impl<C> EventReconciler<C>
where
    C: ObjectClient<Event>,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C> Reconciler for EventReconciler<C>
where
    C: ObjectClient<Event> + 'static,
{
    type Kind = Event;

    const KIND: &'static str = "Event";

    #[instrument(skip_all, fields(request = %request))]
    async fn reconcile(&self, request: &ReconcileRequest) -> Result<Action> {
        debug!("Reconciling Event {}", request);

        let event = match self.client.get(&request.namespace, &request.name).await {
            Ok(event) => event,
            Err(e) if e.is_not_found() => {
                info!("Event {} not found, treating as deleted", request);
                return Ok(Action::await_change());
            }
            Err(e) => return Err(e),
        };

        info!(
            event = %event.name_any(),
            reason = event.reason.as_deref().unwrap_or_default(),
            "Observed Event"
        );

        Ok(Action::await_change())
    }
}
