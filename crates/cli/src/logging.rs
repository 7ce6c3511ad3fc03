use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Default filter for a `-v` count. `RUST_LOG` overrides it.
pub fn default_filter(verbosity: u8) -> &'static str {
	// 0 = errors only, 1 = lifecycle info, 2+ = request and frame tracing
	match verbosity {
		0 => "error",
		1 => "warn,lcu=info,lcu_cli=info",
		_ => "info,lcu=debug,lcu_cli=debug",
	}
}

pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
