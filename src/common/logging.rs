use owo_colors::{OwoColorize, Stream::Stderr};

/// Enable the logger
///
/// Logs go to STDERR so that STDOUT can carry command output.
pub fn enable_logger(verbose: bool) {
    let result = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}{}: {}",
                // Level messages are padded to keep the output looking somewhat sane
                match record.level() {
                    log::Level::Error => "ERROR"
                        .if_supports_color(Stderr, |text| text.red())
                        .if_supports_color(Stderr, |text| text.bold())
                        .to_string(),
                    log::Level::Warn => "WARN "
                        .if_supports_color(Stderr, |text| text.yellow())
                        .if_supports_color(Stderr, |text| text.bold())
                        .to_string(),
                    log::Level::Info => "INFO "
                        .if_supports_color(Stderr, |text| text.green())
                        .if_supports_color(Stderr, |text| text.bold())
                        .to_string(),
                    log::Level::Debug => "DEBUG"
                        .if_supports_color(Stderr, |text| text.bright_blue())
                        .if_supports_color(Stderr, |text| text.bold())
                        .to_string(),
                    log::Level::Trace => "TRACE"
                        .if_supports_color(Stderr, |text| text.bright_white())
                        .if_supports_color(Stderr, |text| text.bold())
                        .to_string(),
                },
                // Show the emitting crate when verbose logging is enabled
                if verbose {
                    format!(" [{}]", record.target().split("::").next().unwrap_or_default())
                } else {
                    String::new()
                }
                .if_supports_color(Stderr, |text| text.bright_black()),
                message
            ));
        })
        // VIPAM_TRACE overrides the CLI flags
        .level(match std::env::var("VIPAM_TRACE") {
            Ok(_) => log::LevelFilter::Trace,
            Err(_) if verbose => log::LevelFilter::Debug,
            Err(_) => log::LevelFilter::Info,
        })
        .chain(std::io::stderr())
        .apply();

    if let Err(err) = result {
        eprintln!("Failed to set up logging: {err}");
    }
}
