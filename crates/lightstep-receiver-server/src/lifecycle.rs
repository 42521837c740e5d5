// Front-end lifecycle
//
// Each enabled protocol is a `FrontEnd` with an explicit start/shutdown pair.
// `LightstepReceiver` composes them; the embedding process supplies a `Host`
// that learns about listener failures after start.

use crate::forwarding::Forwarder;
use crate::{grpc, pb_http, thrift_http};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use lightstep_receiver_config::ProtocolsConfig;
use lightstep_receiver_core::{Telemetry, TraceSink};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Receives component-health events from running front-ends.
pub trait Host: Send + Sync {
    /// A listener stopped serving on its own. It will not be restarted.
    fn report_fatal_error(&self, component: &'static str, error: anyhow::Error);
}

#[derive(Debug)]
pub struct FatalError {
    pub component: &'static str,
    pub error: anyhow::Error,
}

/// Host that forwards fatal errors over a channel.
#[derive(Debug, Clone)]
pub struct ChannelHost {
    tx: mpsc::UnboundedSender<FatalError>,
}

impl ChannelHost {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FatalError>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Host for ChannelHost {
    fn report_fatal_error(&self, component: &'static str, error: anyhow::Error) {
        if self.tx.send(FatalError { component, error }).is_err() {
            warn!(component, "fatal error reported after host went away");
        }
    }
}

#[async_trait]
pub trait FrontEnd: Send {
    /// Protocol name as used in configuration.
    fn name(&self) -> &'static str;

    /// Bind the listener and start serving in the background. Bind failures
    /// are returned; later failures go to `host`.
    async fn start(&mut self, host: Arc<dyn Host>) -> Result<()>;

    /// Stop accepting connections and wait until in-flight requests finish.
    async fn shutdown(&mut self) -> Result<()>;

    /// Bound address while running.
    fn local_addr(&self) -> Option<SocketAddr>;
}

/// A spawned accept loop and the means to stop it.
pub(crate) struct ListenerTask {
    pub local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ListenerTask {
    /// Spawn `serve`, which must return once its shutdown future resolves.
    pub fn spawn<F, Fut>(
        name: &'static str,
        local_addr: SocketAddr,
        host: Arc<dyn Host>,
        serve: F,
    ) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let (shutdown, rx) = oneshot::channel();
        let serving = serve(rx);
        let task = tokio::spawn(async move {
            if let Err(error) = serving.await {
                tracing::error!(protocol = name, error = %error, "listener failed");
                host.report_fatal_error(name, error);
            }
        });
        info!(protocol = name, address = %local_addr, "started listener");
        Self {
            local_addr,
            shutdown,
            task,
        }
    }

    pub async fn stop(self) -> Result<()> {
        // The task may already have exited after a fatal error.
        let _ = self.shutdown.send(());
        self.task.await.context("listener task panicked")
    }
}

/// The set of enabled front-ends.
pub struct LightstepReceiver {
    front_ends: Vec<Box<dyn FrontEnd>>,
}

impl LightstepReceiver {
    pub fn new(
        protocols: &ProtocolsConfig,
        sink: Arc<dyn TraceSink>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        let forwarder = Forwarder::new(sink, telemetry);
        let mut front_ends: Vec<Box<dyn FrontEnd>> = Vec::new();
        if let Some(config) = &protocols.pbgrpc {
            front_ends.push(Box::new(grpc::GrpcFrontEnd::new(
                config.clone(),
                forwarder.clone(),
            )));
        }
        if let Some(config) = &protocols.pbhttp {
            front_ends.push(Box::new(pb_http::front_end(config, forwarder.clone())));
        }
        if let Some(config) = &protocols.thrift {
            front_ends.push(Box::new(thrift_http::front_end(config, forwarder.clone())));
        }
        Self::from_front_ends(front_ends)
    }

    pub fn from_front_ends(front_ends: Vec<Box<dyn FrontEnd>>) -> Self {
        Self { front_ends }
    }

    /// Start every front-end in order. If one fails, those already started
    /// are shut down again before the error is returned.
    pub async fn start(&mut self, host: Arc<dyn Host>) -> Result<()> {
        if self.front_ends.is_empty() {
            return Err(anyhow!("no protocols enabled"));
        }
        for index in 0..self.front_ends.len() {
            let name = self.front_ends[index].name();
            if let Err(error) = self.front_ends[index].start(Arc::clone(&host)).await {
                for started in self.front_ends[..index].iter_mut().rev() {
                    if let Err(stop_error) = started.shutdown().await {
                        warn!(protocol = started.name(), error = %stop_error, "failed to stop front-end");
                    }
                }
                return Err(error.context(format!("failed to start {} front-end", name)));
            }
        }
        Ok(())
    }

    /// Shut every front-end down, collecting all failures.
    pub async fn shutdown(&mut self) -> Result<()> {
        let mut errors = Vec::new();
        for front_end in self.front_ends.iter_mut() {
            if let Err(error) = front_end.shutdown().await {
                errors.push(format!("{}: {:#}", front_end.name(), error));
            }
        }
        if !errors.is_empty() {
            bail!("failed to shut down front-ends: {}", errors.join("; "));
        }
        info!("all front-ends stopped");
        Ok(())
    }

    /// Bound addresses of running front-ends.
    pub fn local_addrs(&self) -> Vec<(&'static str, SocketAddr)> {
        self.front_ends
            .iter()
            .filter_map(|front_end| Some((front_end.name(), front_end.local_addr()?)))
            .collect()
    }

    pub fn local_addr(&self, name: &str) -> Option<SocketAddr> {
        self.front_ends
            .iter()
            .find(|front_end| front_end.name() == name)
            .and_then(|front_end| front_end.local_addr())
    }
}
