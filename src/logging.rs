use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable consulted when `RUST_LOG` is unset.
pub const LOG_ENV: &str = "GRADING_LOG";

/// Initialize structured logging on stderr so stdout stays free for results.
pub fn init_tracing(verbose: bool, log_level: Option<&str>, log_json: bool) -> anyhow::Result<()> {
    let directive = match (verbose, log_level) {
        (_, Some(level)) => filter_directive(level),
        (true, None) => "course_grading=debug".to_string(),
        (false, None) => "course_grading=warn".to_string(),
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env(LOG_ENV))
        .unwrap_or_else(|_| EnvFilter::new(directive));

    let registry = tracing_subscriber::registry().with(filter);

    if log_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    }

    Ok(())
}

/// A bare level applies to this crate only; full directives pass through.
fn filter_directive(level: &str) -> String {
    if level.contains('=') {
        level.to_string()
    } else {
        format!("course_grading={level}")
    }
}
