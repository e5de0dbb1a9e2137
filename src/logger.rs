use std::fs::File;
use std::sync::Mutex;

use anyhow::{anyhow, Context};
use time::{
    format_description::{self, parse},
    OffsetDateTime,
};
use tracing::{subscriber::set_global_default, Level};
use tracing_subscriber::FmtSubscriber;

/// Install the global tracing subscriber.
///
/// Logs go to stdout, or to a `<date>_log.txt` file in the current directory if `to_file`.
///
/// # Errors
/// Returned if the log file cannot be created or a global subscriber is already set.
pub fn init_logger(level: Level, to_file: bool) -> anyhow::Result<()> {
    // Fails once threads are running on some platforms, UTC is fine then
    let local_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        local_offset,
        format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]")
            .context("invalid timer format")?,
    );

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_timer(timer);

    let result = if to_file {
        let file_name = get_log_file_name()?;
        let file = File::create(&file_name).with_context(|| format!("creating {file_name}"))?;
        set_global_default(
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish(),
        )
    } else {
        set_global_default(builder.with_writer(std::io::stdout).finish())
    };

    result.map_err(|e| anyhow!("could not set global default tracing subscriber: {e}"))
}

/// Level obtained by moving `shift` steps away from `INFO`, positive being more verbose.
pub fn shifted_level(shift: i32) -> Level {
    match shift {
        i32::MIN..=-2 => Level::ERROR,
        -1 => Level::WARN,
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn get_log_file_name() -> anyhow::Result<String> {
    let format = parse("[year]-[month]-[day]_[hour]:[minute]:[second]_log.txt")?;
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    Ok(now.format(&format)?)
}
