//! Start/end log lines around every operation.

use crate::error::UrpcResult;
use crate::middleware::context::MiddlewareContext;
use crate::middleware::manager::{Middleware, Next};
use async_trait::async_trait;
use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Extra destination for emitted lines, e.g. an in-memory capture.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

pub struct LoggingMiddleware {
    sink: Option<LogSink>,
}

impl LoggingMiddleware {
    pub const NAME: &'static str = "logging";

    pub fn new() -> Self {
        Self { sink: None }
    }

    pub fn with_sink(sink: LogSink) -> Self {
        Self { sink: Some(sink) }
    }

    fn emit(&self, line: &str) {
        if let Some(sink) = &self.sink {
            sink(line);
        }
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> UrpcResult<Value> {
        let target = format!(
            "op={} entity={} source={} request_id={}",
            ctx.operation,
            ctx.entity(),
            ctx.source(),
            ctx.metadata.request_id
        );
        let start_line = format!("event=urpc_call module=middleware status=start {target}");
        info!("{start_line}");
        self.emit(&start_line);

        let started_at = Instant::now();
        let outcome = next.run(ctx).await;
        let elapsed_ms = started_at.elapsed().as_millis();

        match &outcome {
            Ok(_) => {
                let line = format!(
                    "event=urpc_call module=middleware status=ok {target} completed in {elapsed_ms}ms"
                );
                info!("{line}");
                self.emit(&line);
            }
            Err(err) => {
                let line = format!(
                    "event=urpc_call module=middleware status=error {target} failed after {elapsed_ms}ms error={err}"
                );
                warn!("{line}");
                self.emit(&line);
            }
        }
        outcome
    }
}
