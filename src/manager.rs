//! Process lifecycle for the example binaries
//!
//! A [`Manager`] owns the Kubernetes client and the watch scope. Reconcilers
//! and admission handlers are registered on it, then [`Manager::start`] runs
//! them next to the metrics server until one exits or a shutdown signal
//! arrives.

use futures::future::BoxFuture;
use futures::FutureExt;
use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use tokio::signal;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::client::KubeClient;
use crate::config::ManagerConfig;
use crate::controllers::{self, ControllerOptions};
use crate::metrics;
use crate::reconcilers::Reconciler;
use crate::webhook::{self, AdmissionHandler, WebhookRegistry};

/// Registration surface for controllers and webhooks
pub struct Manager {
    client: Client,
    config: ManagerConfig,
    controllers: Vec<(&'static str, BoxFuture<'static, ()>)>,
    webhooks: WebhookRegistry,
}

impl Manager {
    /// Connect to the cluster from the ambient kubeconfig or in-cluster config
    pub async fn new(config: ManagerConfig) -> anyhow::Result<Self> {
        let client = Client::try_default().await?;
        info!(scope = config.scope(), "Connected to Kubernetes API server");
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: ManagerConfig) -> Self {
        Self {
            client,
            config,
            controllers: Vec::new(),
            webhooks: WebhookRegistry::new(),
        }
    }

    /// Client for reconcilers
    pub fn client(&self) -> KubeClient {
        KubeClient::new(self.client.clone())
    }

    /// Api for `K` limited to the configured namespace, if any
    pub fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        match &self.config.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    /// Register a reconciler for its resource kind
    pub fn add_controller<R>(&mut self, reconciler: R, options: ControllerOptions<R::Kind>)
    where
        R: Reconciler,
        R::Kind: Resource<Scope = NamespaceResourceScope>,
    {
        let api = self.api::<R::Kind>();
        self.controllers
            .push((R::KIND, controllers::run(api, reconciler, options).boxed()));
    }

    /// Register an admission handler at `path`
    pub fn register_webhook(&mut self, path: &str, handler: impl AdmissionHandler + 'static) {
        info!(path, "Registering webhook");
        self.webhooks.register(path, handler);
    }

    /// Run everything registered until a task exits or a shutdown signal arrives
    pub async fn start(self) -> anyhow::Result<()> {
        let mut tasks = JoinSet::new();

        let metrics_port = self.config.metrics_port;
        tasks.spawn(async move {
            if let Err(e) = metrics::serve(metrics_port).await {
                error!("Metrics server failed: {}", e);
            }
            "metrics server"
        });
        info!("Metrics server starting on port {}", metrics_port);

        if !self.webhooks.is_empty() {
            let webhook_port = self.config.webhook_port;
            let registry = self.webhooks;
            for path in registry.paths() {
                info!(path, "Serving admission webhook");
            }
            tasks.spawn(async move {
                if let Err(e) = webhook::serve(webhook_port, registry).await {
                    error!("Webhook server failed: {}", e);
                }
                "webhook server"
            });
            info!("Webhook server starting on port {}", webhook_port);
        }

        for (kind, controller) in self.controllers {
            tasks.spawn(async move {
                controller.await;
                kind
            });
        }

        tokio::select! {
            Some(exited) = tasks.join_next() => match exited {
                Ok(name) => error!("{} exited unexpectedly", name),
                Err(e) => error!("Task failed: {}", e),
            },
            _ = shutdown_signal() => {
                info!("Received shutdown signal, stopping manager");
            }
        }

        tasks.shutdown().await;
        Ok(())
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install CTRL+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
