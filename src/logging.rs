// Logger bootstrap for embedding shells.
//
// The library itself only logs through the `log` facade and never
// installs a logger on its own. Hosts call `init` once at startup;
// repeated calls are no-ops.
use anyhow::Result;
use once_cell::sync::OnceCell;

static LOGGER: OnceCell<()> = OnceCell::new();

#[cfg(not(target_os = "android"))]
pub fn init(level: log::LevelFilter) -> Result<()> {
    LOGGER.get_or_try_init(|| -> Result<()> {
        use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
        TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)?;
        Ok(())
    })?;
    Ok(())
}

#[cfg(target_os = "android")]
pub fn init(level: log::LevelFilter) -> Result<()> {
    LOGGER.get_or_try_init(|| -> Result<()> {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(level)
                .with_tag("HabitudeRust"),
        );
        Ok(())
    })?;
    Ok(())
}
