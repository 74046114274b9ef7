//! Report data model and snapshot construction.
//!
//! Field names here are the wire contract with the collector and must not
//! change: the topology goes out as `Host {nodes, metric_templates,
//! controls}` next to a `Plugins` list, nodes are keyed by
//! `"<host_id>;<host>"`, and control state rides in `latestControls`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::mode::Mode;
use crate::sampler::{CpuSampler, SamplerError};

/// Fixed suffix token combined with the host identity to form the node key.
const HOST_NODE_SUFFIX: &str = "<host>";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("metric unavailable: {0}")]
    MetricUnavailable(#[from] SamplerError),
    #[error("reporting core is not running")]
    CoreStopped,
}

/// One full report: the host topology plus the plugin's self-description.
#[derive(Debug, Serialize)]
pub struct Report {
    #[serde(rename = "Host")]
    pub host: Topology,
    #[serde(rename = "Plugins")]
    pub plugins: Vec<PluginSpec>,
}

#[derive(Debug, Serialize)]
pub struct Topology {
    pub nodes: HashMap<String, Node>,
    pub metric_templates: HashMap<String, MetricTemplate>,
    pub controls: HashMap<String, Control>,
}

#[derive(Debug, Serialize)]
pub struct Node {
    pub metrics: HashMap<String, Metric>,
    #[serde(rename = "latestControls", skip_serializing_if = "HashMap::is_empty")]
    pub latest_controls: HashMap<String, ControlEntry>,
}

#[derive(Debug, Serialize)]
pub struct Metric {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<Sample>,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Serialize)]
pub struct Sample {
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub value: f64,
}

#[derive(Debug, Serialize)]
pub struct ControlEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub value: ControlState,
}

#[derive(Debug, Serialize)]
pub struct ControlState {
    pub dead: bool,
}

#[derive(Debug, Serialize)]
pub struct MetricTemplate {
    pub id: &'static str,
    pub label: &'static str,
    pub format: &'static str,
    pub priority: f64,
}

#[derive(Debug, Serialize)]
pub struct Control {
    pub id: &'static str,
    pub human: &'static str,
    pub icon: &'static str,
    pub rank: u32,
}

#[derive(Debug, Serialize)]
pub struct PluginSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub interfaces: Vec<&'static str>,
    pub api_version: &'static str,
}

/// Control invocation sent by the collector.
///
/// Missing fields deserialize as empty strings and fall through node/control
/// validation rather than failing the parse.
#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    #[serde(rename = "NodeID", default)]
    pub node_id: String,
    #[serde(rename = "Control", default)]
    pub control: String,
}

/// Wrapper for the control response: a full report returned inline so the
/// collector sees the toggle without waiting for its next poll.
#[derive(Debug, Serialize)]
pub struct ControlResponse {
    #[serde(rename = "shortcutReport")]
    pub shortcut_report: Report,
}

/// Node key for this host in the topology.
pub fn topology_host(host_id: &str) -> String {
    format!("{host_id};{HOST_NODE_SUFFIX}")
}

/// The plugin's constant self-description.
pub fn plugin_spec() -> PluginSpec {
    PluginSpec {
        id: "iowait",
        label: "iowait",
        description: "Adds a graph of CPU IO Wait to hosts",
        interfaces: vec!["reporter", "controller"],
        api_version: "1",
    }
}

/// Builds a full snapshot for the given mode.
///
/// Takes one fresh measurement; any sampler failure fails the report
/// wholesale, there are no partial reports. Deterministic given the mode and
/// the sampler's return.
pub async fn build_report<S: CpuSampler>(
    mode: Mode,
    host_id: &str,
    sampler: &S,
) -> Result<Report, ReportError> {
    let (metric_id, metric_label) = mode.metric();
    let value = sampler.measure(mode.field()).await?;
    let now = OffsetDateTime::now_utc();

    let mut metrics = HashMap::new();
    metrics.insert(
        metric_id.to_string(),
        Metric {
            samples: vec![Sample { date: now, value }],
            min: 0.0,
            max: 100.0,
        },
    );

    let mut latest_controls = HashMap::new();
    for details in mode.controls() {
        latest_controls.insert(
            details.id.to_string(),
            ControlEntry {
                timestamp: now,
                value: ControlState { dead: details.dead },
            },
        );
    }

    let mut nodes = HashMap::new();
    nodes.insert(
        topology_host(host_id),
        Node {
            metrics,
            latest_controls,
        },
    );

    let mut metric_templates = HashMap::new();
    metric_templates.insert(
        metric_id.to_string(),
        MetricTemplate {
            id: metric_id,
            label: metric_label,
            format: "percent",
            priority: 0.1,
        },
    );

    let mut controls = HashMap::new();
    for details in mode.controls() {
        controls.insert(
            details.id.to_string(),
            Control {
                id: details.id,
                human: details.human,
                icon: details.icon,
                rank: 1,
            },
        );
    }

    Ok(Report {
        host: Topology {
            nodes,
            metric_templates,
            controls,
        },
        plugins: vec![plugin_spec()],
    })
}
