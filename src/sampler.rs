//! CPU percentage sampling via `iostat`.
//!
//! Every measurement re-invokes `iostat -c` and extracts one field from the
//! avg-cpu data row. There is no caching and no retry: a failed invocation
//! propagates to the caller as-is.

use std::future::Future;
use std::num::ParseFloatError;

use thiserror::Error;
use tokio::process::Command;

/// Number of columns in the avg-cpu data row of `iostat -c`.
const CPU_FIELD_COUNT: usize = 6;

/// Fields of the avg-cpu row the plugin knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuField {
    Iowait,
    Idle,
}

impl CpuField {
    /// Column position within the data row.
    pub fn index(self) -> usize {
        match self {
            CpuField::Iowait => 3,
            CpuField::Idle => 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("unexpected iostat output: {0:?}")]
    MalformedOutput(String),
    #[error("iostat field index {index} out of range ({available} fields)")]
    FieldIndexOutOfRange { index: usize, available: usize },
    #[error("failed to parse iostat field: {0}")]
    Parse(#[from] ParseFloatError),
    #[error("failed to run iostat: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of CPU percentage measurements.
///
/// The narrow seam between the reporting core and the external measurement
/// facility; tests substitute doubles returning canned values.
pub trait CpuSampler: Send + Sync + 'static {
    fn measure(&self, field: CpuField)
        -> impl Future<Output = Result<f64, SamplerError>> + Send;
}

/// The real sampler: shells out to `iostat -c` on every call.
#[derive(Debug, Default, Clone)]
pub struct IostatSampler;

impl IostatSampler {
    async fn snapshot(&self) -> Result<String, SamplerError> {
        let output = Command::new("iostat").arg("-c").output().await?;
        if !output.status.success() {
            return Err(SamplerError::Io(std::io::Error::other(format!(
                "iostat exited with {}",
                output.status
            ))));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl CpuSampler for IostatSampler {
    fn measure(
        &self,
        field: CpuField,
    ) -> impl Future<Output = Result<f64, SamplerError>> + Send {
        async move {
            let text = self.snapshot().await?;
            parse_cpu_field(&text, field)
        }
    }
}

/// Extracts one field from captured `iostat -c` output.
///
/// Expected shape (kernel banner, blank line, column labels, data row):
///
/// ```text
/// Linux 4.2.0-25-generic (a109563eab38)  04/01/16  _x86_64_  (4 CPU)
///
/// avg-cpu:  %user   %nice %system %iowait  %steal   %idle
///            2.37    0.00    1.58    0.01    0.00   96.04
/// ```
pub fn parse_cpu_field(output: &str, field: CpuField) -> Result<f64, SamplerError> {
    cpu_field_at(output, field.index())
}

fn cpu_field_at(output: &str, index: usize) -> Result<f64, SamplerError> {
    let lines: Vec<&str> = output.lines().collect();
    if lines.len() < 4 {
        return Err(SamplerError::MalformedOutput(output.to_string()));
    }

    let values: Vec<&str> = lines[3].split_whitespace().collect();
    if values.len() != CPU_FIELD_COUNT {
        return Err(SamplerError::MalformedOutput(output.to_string()));
    }
    if index >= values.len() {
        return Err(SamplerError::FieldIndexOutOfRange {
            index,
            available: values.len(),
        });
    }

    Ok(values[index].parse()?)
}
