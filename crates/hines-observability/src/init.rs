// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output always; with `file-logging`, a daily-rotated `hines.log`
//! under the configured directory as well.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::LogSettings;

/// Keeps background log writers alive; logs flush when it drops
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Directory of the log file, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Build the filter: `RUST_LOG` wins when set, else level plus debug flags
pub fn build_filter(settings: &LogSettings, debug_flags: &CrateDebugFlags) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = debug_flags.to_filter_string_with_default(&settings.level);
    EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter: {}", directives))
}

/// Install the global subscriber
///
/// # Errors
/// Invalid filter, unusable log directory, a log directory without the
/// `file-logging` feature, or a subscriber already installed.
pub fn init_logging(settings: &LogSettings, debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    let filter = build_filter(settings, debug_flags)?;

    let mut layers = Vec::new();
    layers.push(
        tracing_subscriber::fmt::layer()
            .with_target(settings.with_target)
            .with_filter(filter)
            .boxed(),
    );

    #[cfg(feature = "file-logging")]
    let mut file_guard = None;

    if let Some(dir) = &settings.log_dir {
        #[cfg(feature = "file-logging")]
        {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "hines.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            file_guard = Some(guard);
            layers.push(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(build_filter(settings, debug_flags)?)
                    .boxed(),
            );
        }
        #[cfg(not(feature = "file-logging"))]
        anyhow::bail!(
            "log directory {} requested but the 'file-logging' feature is not enabled",
            dir.display()
        );
    }

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guard: file_guard,
        log_dir: settings.log_dir.clone(),
    })
}

/// Console logging at the default level with flags from args and `HINES_DEBUG`
pub fn init_logging_default() -> Result<LoggingGuard> {
    init_logging(&LogSettings::default(), &crate::cli::parse_debug_flags())
}

/// Test-friendly subscriber; repeated calls are no-ops
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
