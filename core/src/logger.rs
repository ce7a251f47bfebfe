//! Logging hook used by `OutlineClient` to report outgoing requests.

use std::fmt;

use crate::context::Context;

pub trait Logger: Send + Sync {
    fn debug(&self, ctx: &Context, message: fmt::Arguments<'_>);
    fn info(&self, ctx: &Context, message: fmt::Arguments<'_>);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _ctx: &Context, _message: fmt::Arguments<'_>) {}
    fn info(&self, _ctx: &Context, _message: fmt::Arguments<'_>) {}
}

/// Forwards to `tracing` under the `outline_client` target. This is the
/// client's default logger.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, _ctx: &Context, message: fmt::Arguments<'_>) {
        tracing::debug!(target: "outline_client", "{message}");
    }

    fn info(&self, _ctx: &Context, message: fmt::Arguments<'_>) {
        tracing::info!(target: "outline_client", "{message}");
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[traced_test]
    #[test]
    fn tracing_logger_emits_both_levels() {
        let ctx = Context::background();
        TracingLogger.info(&ctx, format_args!("GetServerInfo: sending request"));
        TracingLogger.debug(&ctx, format_args!("full url http://host/secret/server"));
        assert!(logs_contain("GetServerInfo: sending request"));
        assert!(logs_contain("full url http://host/secret/server"));
    }
}
