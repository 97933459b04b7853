//! Per-record transform step.
//!
//! A [`Transform`] is either the identity or a sandboxed minijinja
//! expression compiled once per session. The expression sees `record`,
//! `index` (1-based source position) and `key` (the key derived from the raw
//! record) and must evaluate to an object (the new record) or `none` (skip).

mod sandbox;

use std::sync::Arc;

use thiserror::Error;

use loader_core::{record_key, RawRecord};

pub use sandbox::{Sandbox, TransformLimits};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("transform does not compile: {0}")]
    Compile(String),

    #[error("transform raised: {0}")]
    Failed(String),

    #[error("transform error: {0}")]
    Runtime(String),

    #[error("transform must return an object or none, got {0}")]
    InvalidOutput(String),

    #[error("transform exceeded its instruction budget")]
    FuelExhausted,

    #[error("transform exceeded its time limit of {0} ms")]
    Timeout(u64),

    #[error("transform output is {size} bytes, limit is {limit}")]
    OutputTooLarge { size: usize, limit: usize },
}

/// Result of transforming one record.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome {
    Record(RawRecord),
    Skip,
}

/// Where the record sits, used for the `index` and `key` variables.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    pub position: u64,
    pub id_field: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub enum Transform {
    Identity,
    Sandboxed {
        code: Arc<str>,
        sandbox: Arc<Sandbox>,
    },
}

impl Transform {
    /// Compile user code. Absent or blank code yields the identity.
    pub fn compile(code: Option<&str>, limits: TransformLimits) -> Result<Self, TransformError> {
        match code.map(str::trim).filter(|c| !c.is_empty()) {
            None => Ok(Transform::Identity),
            Some(code) => {
                let sandbox = Sandbox::compile(code, limits)?;
                tracing::debug!(code_len = code.len(), fuel = limits.fuel, "compiled transform");
                Ok(Transform::Sandboxed {
                    code: Arc::from(code),
                    sandbox: Arc::new(sandbox),
                })
            }
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Transform::Identity)
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Transform::Identity => None,
            Transform::Sandboxed { code, .. } => Some(code),
        }
    }

    /// Transform one record, bounded by the sandbox's time limit.
    ///
    /// Evaluation runs on the blocking pool. On timeout the evaluation thread
    /// is abandoned; fuel guarantees it terminates on its own.
    pub async fn apply(
        &self,
        raw: RawRecord,
        ctx: TransformContext<'_>,
    ) -> Result<TransformOutcome, TransformError> {
        let sandbox = match self {
            Transform::Identity => return Ok(TransformOutcome::Record(raw)),
            Transform::Sandboxed { sandbox, .. } => Arc::clone(sandbox),
        };

        let key = record_key(&raw, ctx.id_field, ctx.position);
        let position = ctx.position;
        let time_limit = sandbox.limits().time_limit;

        let task = tokio::task::spawn_blocking(move || sandbox.eval(&raw, position, &key));
        match tokio::time::timeout(time_limit, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(TransformError::Runtime(format!(
                "evaluation task failed: {}",
                join_err
            ))),
            Err(_) => Err(TransformError::Timeout(time_limit.as_millis() as u64)),
        }
    }
}
