// Axum listener shared by the HTTP front-ends

use crate::lifecycle::{FrontEnd, Host, ListenerTask};
use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

/// Serves one router on one endpoint.
pub struct HttpFrontEnd {
    name: &'static str,
    endpoint: String,
    router: Router,
    listener: Option<ListenerTask>,
}

impl HttpFrontEnd {
    pub fn new(name: &'static str, endpoint: impl Into<String>, router: Router) -> Self {
        Self {
            name,
            endpoint: endpoint.into(),
            router,
            listener: None,
        }
    }
}

#[async_trait]
impl FrontEnd for HttpFrontEnd {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn start(&mut self, host: Arc<dyn Host>) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.endpoint)
            .await
            .with_context(|| format!("Failed to bind to {}", self.endpoint))?;
        let local_addr = listener.local_addr()?;
        let router = self.router.clone();

        self.listener = Some(ListenerTask::spawn(
            self.name,
            local_addr,
            host,
            move |shutdown| async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.await;
                    })
                    .await
                    .context("Server error")
            },
        ));
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        if let Some(listener) = self.listener.take() {
            listener.stop().await?;
        }
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(|listener| listener.local_addr)
    }
}
