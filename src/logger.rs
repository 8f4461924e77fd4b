//! Diagnostic log channel / 诊断日志
//!
//! Silent unless `debug` is set. With `debug`, lines go to the caller's
//! `log_func` sink when one is configured, otherwise to `tracing`.

use std::fmt;
use std::sync::Arc;

/// Custom log sink / 自定义日志输出
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone, Default)]
pub struct DiagLog {
    enabled: bool,
    sink: Option<LogSink>,
}

impl DiagLog {
    pub fn new(debug: bool, sink: Option<LogSink>) -> Self {
        Self {
            enabled: debug,
            sink,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Formats lazily: nothing is rendered when the channel is off
    pub fn log(&self, args: fmt::Arguments<'_>) {
        if !self.enabled {
            return;
        }
        match &self.sink {
            Some(sink) => sink(&args.to_string()),
            None => tracing::debug!(target: "im_fulltext", "{}", args),
        }
    }
}

impl fmt::Debug for DiagLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagLog")
            .field("enabled", &self.enabled)
            .field("custom_sink", &self.sink.is_some())
            .finish()
    }
}
