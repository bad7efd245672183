use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use pprof::{ProfilerGuard, ProfilerGuardBuilder};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the stderr log subscriber and, when `profile` is set, starts a CPU profiler.
///
/// Stdout stays reserved for command output such as encoded JSON lines.
pub fn init_telemetry(profile: bool) -> Option<ProfilerGuard<'static>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    // A subscriber may already be installed when commands run inside tests.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();

    if !profile {
        return None;
    }
    match ProfilerGuardBuilder::default()
        .frequency(1000)
        .blocklist(&["libc", "libpthread", "libgcc", "libm"])
        .build()
    {
        Ok(guard) => Some(guard),
        Err(err) => {
            warn!(error = %err, "CPU profiler unavailable, continuing without it");
            None
        }
    }
}

/// Renders the samples collected by `guard` as a flamegraph SVG at `output_path`.
pub fn write_profile(guard: ProfilerGuard<'_>, output_path: &Path) -> Result<()> {
    let report = guard
        .report()
        .build()
        .context("failed to build CPU profile report")?;
    let mut file = File::create(output_path)
        .with_context(|| format!("failed to create profile file {}", output_path.display()))?;
    report
        .flamegraph(&mut file)
        .with_context(|| format!("failed to write flamegraph to {}", output_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_profile_reports_unwritable_destination() {
        let dir = tempfile::tempdir().expect("temp dir");
        let output = dir.path().join("missing").join("profile.svg");
        let guard = ProfilerGuardBuilder::default()
            .frequency(100)
            .build()
            .expect("profiler");

        let err = write_profile(guard, &output).unwrap_err();
        assert!(err.to_string().contains("profile.svg"), "{err:#}");
        assert!(!output.exists());
    }
}
