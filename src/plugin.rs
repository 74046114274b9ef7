//! The mode-owning plugin core.
//!
//! All mutable state (the active [`Mode`]) lives inside one task that
//! consumes commands from an mpsc channel and answers over oneshot channels.
//! A command runs to completion (including the iostat invocation) before
//! the next is taken, so a report never observes a half-applied toggle and
//! queued requests drain in arrival order.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::mode::Mode;
use crate::report::{self, ControlRequest, Report, ReportError};
use crate::sampler::CpuSampler;

const COMMAND_BUFFER: usize = 16;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("unknown node {got:?}, expected {expected:?}")]
    NodeMismatch { expected: String, got: String },
    #[error("control {got:?} is not live, expected {expected:?}")]
    ControlMismatch { expected: &'static str, got: String },
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl ControlError {
    /// Node and control mismatches are client errors and leave the mode
    /// untouched; anything else is a server-side failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ControlError::NodeMismatch { .. } | ControlError::ControlMismatch { .. }
        )
    }
}

enum PluginCommand {
    Report {
        reply: oneshot::Sender<Result<Report, ReportError>>,
    },
    Control {
        request: ControlRequest,
        reply: oneshot::Sender<Result<Report, ControlError>>,
    },
}

/// Cloneable entry point to the plugin core, held by the HTTP handlers.
#[derive(Clone)]
pub struct PluginHandle {
    tx: mpsc::Sender<PluginCommand>,
}

impl PluginHandle {
    /// Builds a fresh report under the current mode.
    pub async fn report(&self) -> Result<Report, ReportError> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(PluginCommand::Report { reply }).await.is_err() {
            return Err(ReportError::CoreStopped);
        }
        rx.await.unwrap_or(Err(ReportError::CoreStopped))
    }

    /// Validates and applies a control invocation, returning the post-toggle
    /// report.
    pub async fn control(&self, request: ControlRequest) -> Result<Report, ControlError> {
        let (reply, rx) = oneshot::channel();
        let command = PluginCommand::Control { request, reply };
        if self.tx.send(command).await.is_err() {
            return Err(ControlError::Report(ReportError::CoreStopped));
        }
        rx.await
            .unwrap_or(Err(ControlError::Report(ReportError::CoreStopped)))
    }
}

struct Plugin<S> {
    host_id: String,
    mode: Mode,
    sampler: S,
    rx: mpsc::Receiver<PluginCommand>,
}

impl<S: CpuSampler> Plugin<S> {
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                PluginCommand::Report { reply } => {
                    let result =
                        report::build_report(self.mode, &self.host_id, &self.sampler).await;
                    let _ = reply.send(result);
                }
                PluginCommand::Control { request, reply } => {
                    let result = self.apply_control(request).await;
                    let _ = reply.send(result);
                }
            }
        }
    }

    /// Checks the request against the current topology and control table,
    /// flips the mode, and reports under the new mode. Validation failures
    /// never mutate the mode.
    async fn apply_control(&mut self, request: ControlRequest) -> Result<Report, ControlError> {
        let expected_node = report::topology_host(&self.host_id);
        if request.node_id != expected_node {
            warn!(expected = %expected_node, got = %request.node_id, "bad node id");
            return Err(ControlError::NodeMismatch {
                expected: expected_node,
                got: request.node_id,
            });
        }

        let live = self.mode.live_control();
        if request.control != live {
            warn!(expected = %live, got = %request.control, "bad control id");
            return Err(ControlError::ControlMismatch {
                expected: live,
                got: request.control,
            });
        }

        self.mode.toggle();
        info!(mode = ?self.mode, "switched active metric");

        let report = report::build_report(self.mode, &self.host_id, &self.sampler).await?;
        Ok(report)
    }
}

/// Spawns the plugin core with the initial mode and returns its handle.
pub fn spawn_plugin<S: CpuSampler>(host_id: String, sampler: S) -> PluginHandle {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let plugin = Plugin {
        host_id,
        mode: Mode::Idle,
        sampler,
        rx,
    };
    tokio::spawn(plugin.run());
    PluginHandle { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{SWITCH_TO_IDLE, SWITCH_TO_IOWAIT};
    use crate::report::topology_host;
    use crate::sampler::{CpuField, SamplerError};
    use std::future::Future;

    struct StaticSampler;

    impl CpuSampler for StaticSampler {
        fn measure(
            &self,
            field: CpuField,
        ) -> impl Future<Output = Result<f64, SamplerError>> + Send {
            let value = match field {
                CpuField::Iowait => 1.5,
                CpuField::Idle => 72.3,
            };
            async move { Ok(value) }
        }
    }

    fn control_request(node_id: &str, control: &str) -> ControlRequest {
        serde_json::from_value(serde_json::json!({
            "NodeID": node_id,
            "Control": control,
        }))
        .unwrap()
    }

    fn active_metric(report: &Report) -> String {
        report.host.metric_templates.keys().next().unwrap().clone()
    }

    #[tokio::test]
    async fn reports_are_stable_without_controls() {
        let handle = spawn_plugin("host-a".to_string(), StaticSampler);

        let first = handle.report().await.unwrap();
        let second = handle.report().await.unwrap();

        assert_eq!(active_metric(&first), "idle");
        assert_eq!(active_metric(&second), "idle");

        let date_of = |r: &Report| {
            r.host.nodes[&topology_host("host-a")].metrics["idle"].samples[0].date
        };
        assert!(date_of(&second) >= date_of(&first));
    }

    #[tokio::test]
    async fn control_round_trip_flips_and_flips_back() {
        let handle = spawn_plugin("host-a".to_string(), StaticSampler);
        let node = topology_host("host-a");

        let flipped = handle
            .control(control_request(&node, SWITCH_TO_IOWAIT))
            .await
            .unwrap();
        assert_eq!(active_metric(&flipped), "iowait");

        // The opposite control is live now, so toggling again succeeds.
        let back = handle
            .control(control_request(&node, SWITCH_TO_IDLE))
            .await
            .unwrap();
        assert_eq!(active_metric(&back), "idle");
    }

    #[tokio::test]
    async fn dead_control_is_rejected_without_mutation() {
        let handle = spawn_plugin("host-a".to_string(), StaticSampler);
        let node = topology_host("host-a");

        let err = handle
            .control(control_request(&node, SWITCH_TO_IDLE))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::ControlMismatch { .. }));
        assert!(err.is_validation());

        let report = handle.report().await.unwrap();
        assert_eq!(active_metric(&report), "idle");
    }

    #[tokio::test]
    async fn wrong_node_is_rejected_regardless_of_control() {
        let handle = spawn_plugin("host-a".to_string(), StaticSampler);

        for control in [SWITCH_TO_IOWAIT, SWITCH_TO_IDLE, "bogus"] {
            let err = handle
                .control(control_request("other;<host>", control))
                .await
                .unwrap_err();
            assert!(matches!(err, ControlError::NodeMismatch { .. }));
        }

        let report = handle.report().await.unwrap();
        assert_eq!(active_metric(&report), "idle");
    }
}
