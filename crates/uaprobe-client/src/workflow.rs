// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The discovery → selection → bootstrap → read workflow.
//!
//! ```text
//! Idle ─▶ Discovering ─▶ Selecting ─▶ Bootstrapping ─▶ Reading ─▶ Done
//!              │              │              │              │
//!              └──────────────┴──────────────┴──────────────┴──▶ Failed(kind)
//! ```
//!
//! Stages run strictly in order on one task. A [`Workflow`] runs once;
//! independent runs build independent workflows and never share a session.
//!
//! # Examples
//!
//! ```rust,ignore
//! use uaprobe_client::prelude::*;
//!
//! let workflow = Workflow::builder()
//!     .request(ReadValueId::value("ns=1;s=Node1".parse()?))
//!     .sink(LineSink::stdout())
//!     .build()?;
//!
//! let outcome = workflow.spawn("opc.tcp://localhost:48040").wait().await?;
//! println!("{} values", outcome.values.len());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::certificate::ClientCertificate;
use crate::client::{select, AttributeReader, DiscoveryClient, SessionBootstrap};
use crate::dispatch::TransportRegistry;
use crate::error::{ConfigurationError, ErrorKind, ProbeError, ProbeResult};
use crate::report::{ReportEvent, ReportSink, TracingSink};
use crate::types::{
    ClientConfig, DataValue, EndpointDescription, ReadValueId, ServerDescription,
    TimestampsToReturn,
};

// =============================================================================
// WorkflowState
// =============================================================================

/// Observable progress of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkflowState {
    /// Not started.
    #[default]
    Idle,
    /// Retrieving the endpoint catalog.
    Discovering,
    /// Choosing an endpoint.
    Selecting,
    /// Opening the secured channel and session.
    Bootstrapping,
    /// Reading attributes.
    Reading,
    /// Finished successfully.
    Done,
    /// Finished with an error of the given kind.
    Failed(ErrorKind),
}

impl WorkflowState {
    /// Returns `true` for `Done` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Discovering => write!(f, "Discovering"),
            Self::Selecting => write!(f, "Selecting"),
            Self::Bootstrapping => write!(f, "Bootstrapping"),
            Self::Reading => write!(f, "Reading"),
            Self::Done => write!(f, "Done"),
            Self::Failed(kind) => write!(f, "Failed({})", kind),
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowOutcome {
    /// Endpoint the session was opened on.
    pub endpoint: EndpointDescription,
    /// Servers returned by discovery.
    pub servers: Vec<ServerDescription>,
    /// Values in request order.
    pub values: Vec<DataValue>,
}

// =============================================================================
// Workflow
// =============================================================================

/// One discovery-to-read run.
pub struct Workflow {
    config: Arc<ClientConfig>,
    registry: Arc<TransportRegistry>,
    certificate: Option<ClientCertificate>,
    requests: Vec<ReadValueId>,
    timestamps: TimestampsToReturn,
    reader: AttributeReader,
    sink: Arc<dyn ReportSink>,
    state: watch::Sender<WorkflowState>,
    started: AtomicBool,
}

impl Workflow {
    /// Creates a new workflow builder.
    pub fn builder() -> WorkflowBuilder {
        WorkflowBuilder::default()
    }

    /// Returns the current state.
    pub fn state(&self) -> WorkflowState {
        *self.state.borrow()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.subscribe()
    }

    /// Returns the read requests.
    pub fn requests(&self) -> &[ReadValueId] {
        &self.requests
    }

    /// Runs the workflow on the current task.
    ///
    /// Every error is reported to the sink as a single failure event and
    /// moves the state to `Failed`. A second call fails with
    /// `WorkflowAlreadyStarted` and leaves state and report untouched.
    pub async fn run(&self, url: &str) -> ProbeResult<WorkflowOutcome> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ConfigurationError::WorkflowAlreadyStarted.into());
        }

        match self.execute(url).await {
            Ok(outcome) => {
                self.transition(WorkflowState::Done);
                tracing::info!(
                    url = %url,
                    endpoint = %outcome.endpoint.endpoint_url,
                    count = outcome.values.len(),
                    "Workflow complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                e.log("workflow");
                self.sink.record(ReportEvent::Failure {
                    kind: e.kind(),
                    message: e.to_string(),
                });
                self.transition(WorkflowState::Failed(e.kind()));
                Err(e)
            }
        }
    }

    /// Runs the workflow on a tokio worker task of the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime. Threads without one
    /// use [`spawn_on`](Self::spawn_on).
    pub fn spawn(self, url: impl Into<String>) -> WorkflowTask {
        self.spawn_on(&Handle::current(), url)
    }

    /// Runs the workflow on a worker task of the runtime behind `runtime`.
    ///
    /// Callable from any thread, so a non-async caller can pair it with
    /// [`WorkflowTask::blocking_wait`].
    pub fn spawn_on(self, runtime: &Handle, url: impl Into<String>) -> WorkflowTask {
        let url = url.into();
        let state = self.subscribe();
        let (sender, result) = oneshot::channel();

        let handle = runtime.spawn(async move {
            let outcome = self.run(&url).await;
            if sender.send(outcome).is_err() {
                tracing::debug!(url = %url, "Workflow result dropped by caller");
            }
        });

        WorkflowTask {
            result,
            state,
            handle,
        }
    }

    async fn execute(&self, url: &str) -> ProbeResult<WorkflowOutcome> {
        self.sink.record(ReportEvent::Target {
            url: url.to_string(),
        });

        url::Url::parse(url).map_err(|e| ConfigurationError::invalid_url(url, e.to_string()))?;

        self.transition(WorkflowState::Discovering);
        let discovery = DiscoveryClient::new(self.config.clone(), self.registry.clone());
        let catalog = discovery.discover(url).await?;
        for server in &catalog.servers {
            self.sink.record(ReportEvent::Server(server.clone()));
        }
        for endpoint in &catalog.endpoints {
            self.sink.record(ReportEvent::Endpoint(endpoint.clone()));
        }

        self.transition(WorkflowState::Selecting);
        let selection = select(url, &catalog.endpoints)?;
        self.sink
            .record(ReportEvent::Selected(selection.endpoint.clone()));

        self.transition(WorkflowState::Bootstrapping);
        let factory = self.registry.resolve(&selection.endpoint)?;
        let session = SessionBootstrap::open(
            &self.config,
            &selection.endpoint,
            factory.as_ref(),
            self.certificate.as_ref(),
        )
        .await?;

        self.transition(WorkflowState::Reading);
        let read = self
            .reader
            .read(&session, self.timestamps, &self.requests)
            .await;
        session.close().await;
        let outcome = read?;

        for value in &outcome.values {
            self.sink.record(ReportEvent::Value(value.clone()));
        }

        Ok(WorkflowOutcome {
            endpoint: selection.endpoint,
            servers: catalog.servers,
            values: outcome.values,
        })
    }

    fn transition(&self, next: WorkflowState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(from = %previous, to = %next, "Workflow state");
    }
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("state", &self.state())
            .field("requests", &self.requests.len())
            .field("timestamps", &self.timestamps)
            .field("registry", &self.registry)
            .finish()
    }
}

// =============================================================================
// WorkflowTask
// =============================================================================

/// Handle to a spawned workflow. The single completion signal of a run.
pub struct WorkflowTask {
    result: oneshot::Receiver<ProbeResult<WorkflowOutcome>>,
    state: watch::Receiver<WorkflowState>,
    handle: JoinHandle<()>,
}

impl WorkflowTask {
    /// Waits for the final result.
    pub async fn wait(self) -> ProbeResult<WorkflowOutcome> {
        self.result
            .await
            .unwrap_or_else(|_| Err(ProbeError::aborted("worker task ended without a result")))
    }

    /// Blocks the current thread until the final result arrives.
    ///
    /// Must not be called from inside an async context. The task must have
    /// been started with [`Workflow::spawn_on`] or from within a runtime.
    pub fn blocking_wait(self) -> ProbeResult<WorkflowOutcome> {
        self.result
            .blocking_recv()
            .unwrap_or_else(|_| Err(ProbeError::aborted("worker task ended without a result")))
    }

    /// Returns the latest state.
    pub fn state(&self) -> WorkflowState {
        *self.state.borrow()
    }

    /// Returns a receiver for state changes.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.clone()
    }

    /// Returns `true` once the worker task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl fmt::Debug for WorkflowTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowTask")
            .field("state", &self.state())
            .field("finished", &self.is_finished())
            .finish()
    }
}

// =============================================================================
// WorkflowBuilder
// =============================================================================

/// Builder for [`Workflow`].
#[derive(Default)]
pub struct WorkflowBuilder {
    config: Option<Arc<ClientConfig>>,
    registry: Option<Arc<TransportRegistry>>,
    certificate: Option<ClientCertificate>,
    requests: Vec<ReadValueId>,
    timestamps: TimestampsToReturn,
    reader: AttributeReader,
    sink: Option<Arc<dyn ReportSink>>,
}

impl WorkflowBuilder {
    /// Sets the client configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(Arc::new(config));
        self
    }

    /// Sets a shared client configuration.
    pub fn shared_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the transport registry.
    pub fn registry(mut self, registry: TransportRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Sets a shared transport registry.
    pub fn shared_registry(mut self, registry: Arc<TransportRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the client certificate, overriding `certificate_path`.
    pub fn certificate(mut self, certificate: ClientCertificate) -> Self {
        self.certificate = Some(certificate);
        self
    }

    /// Adds one read request.
    pub fn request(mut self, request: ReadValueId) -> Self {
        self.requests.push(request);
        self
    }

    /// Adds read requests.
    pub fn requests(mut self, requests: impl IntoIterator<Item = ReadValueId>) -> Self {
        self.requests.extend(requests);
        self
    }

    /// Sets which timestamps to return.
    pub fn timestamps(mut self, timestamps: TimestampsToReturn) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Sets the acceptable value age in milliseconds.
    pub fn max_age(mut self, max_age: f64) -> Self {
        self.reader = self.reader.with_max_age(max_age);
        self
    }

    /// Sets the report sink.
    pub fn sink(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Sets a shared report sink.
    pub fn shared_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the workflow.
    ///
    /// Validates the configuration and loads the certificate from
    /// `certificate_path` when none was set explicitly.
    pub fn build(self) -> ProbeResult<Workflow> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let certificate = match (self.certificate, &config.certificate_path) {
            (Some(certificate), _) => Some(certificate),
            (None, Some(path)) => Some(ClientCertificate::from_file(path)?),
            (None, None) => None,
        };

        let (state, _) = watch::channel(WorkflowState::Idle);

        Ok(Workflow {
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(TransportRegistry::standard())),
            config,
            certificate,
            requests: self.requests,
            timestamps: self.timestamps,
            reader: self.reader,
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink)),
            state,
            started: AtomicBool::new(false),
        })
    }
}
