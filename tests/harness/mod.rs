//! In-process receiver harness for end-to-end tests
//!
//! Starts every front-end on an ephemeral loopback port with a recording
//! sink and a fresh telemetry registry, so tests can drive real clients
//! against it and inspect what came out the other side.

#![allow(dead_code)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use lightstep_receiver_config::{GrpcServerConfig, HttpServerConfig, ProtocolsConfig};
use lightstep_receiver_core::{
    ReceiverTelemetry, RequestMetadata, SinkError, TraceBatch, TraceSink,
};
use lightstep_receiver_server::{ChannelHost, LightstepReceiver};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;

/// Sink that keeps every batch, or refuses all of them with a fixed message.
#[derive(Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<(TraceBatch, RequestMetadata)>>,
    refuse_with: Option<String>,
}

impl RecordingSink {
    pub fn refusing(message: &str) -> Self {
        Self {
            refuse_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn batches(&self) -> Vec<(TraceBatch, RequestMetadata)> {
        self.batches.lock().clone()
    }
}

#[async_trait]
impl TraceSink for RecordingSink {
    async fn consume(&self, batch: TraceBatch, metadata: RequestMetadata) -> Result<(), SinkError> {
        if let Some(message) = &self.refuse_with {
            return Err(SinkError::new(message.clone()));
        }
        self.batches.lock().push((batch, metadata));
        Ok(())
    }
}

pub struct ReceiverHarness {
    receiver: LightstepReceiver,
    pub sink: Arc<RecordingSink>,
    pub telemetry: Arc<ReceiverTelemetry>,
}

impl ReceiverHarness {
    pub async fn start() -> Result<Self> {
        Self::start_with_sink(RecordingSink::default()).await
    }

    pub async fn start_with_sink(sink: RecordingSink) -> Result<Self> {
        let protocols = ProtocolsConfig {
            pbgrpc: Some(GrpcServerConfig {
                endpoint: "127.0.0.1:0".into(),
                ..Default::default()
            }),
            pbhttp: Some(HttpServerConfig::with_endpoint("127.0.0.1:0")),
            thrift: Some(HttpServerConfig::with_endpoint("127.0.0.1:0")),
        };
        let sink = Arc::new(sink);
        let telemetry = Arc::new(ReceiverTelemetry::new());
        let mut receiver = LightstepReceiver::new(&protocols, sink.clone(), telemetry.clone());
        receiver
            .start(Arc::new(ChannelHost::new().0))
            .await
            .context("Failed to start receiver")?;
        Ok(Self {
            receiver,
            sink,
            telemetry,
        })
    }

    pub fn addr(&self, protocol: &str) -> SocketAddr {
        self.receiver
            .local_addr(protocol)
            .unwrap_or_else(|| panic!("{} front-end is not running", protocol))
    }

    pub fn url(&self, protocol: &str, path: &str) -> String {
        format!("http://{}{}", self.addr(protocol), path)
    }

    pub async fn stop(mut self) -> Result<()> {
        self.receiver.shutdown().await
    }
}
