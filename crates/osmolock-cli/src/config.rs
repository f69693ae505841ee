use std::time::Duration;

use anyhow::{bail, Context};

use osmolock_core::constants::{SECONDS_PER_DAY, SECONDS_PER_HOUR};
use osmolock_core::currency::Currency;
use osmolock_lcd::LcdConfig;

/// Resolved runtime settings.
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub chain_id: String,
    pub lcd: LcdConfig,
    /// Currencies the chain registry starts out knowing.
    pub native_currencies: Vec<Currency>,
}

impl CliConfig {
    pub fn new(chain_id: String, lcd_url: String, timeout_secs: u64) -> Self {
        Self {
            chain_id,
            lcd: LcdConfig::default()
                .with_base_url(lcd_url)
                .with_timeout_secs(timeout_secs),
            native_currencies: vec![
                Currency::new("OSMO", "uosmo", 6),
                Currency::new("ION", "uion", 6),
            ],
        }
    }
}

/// Parse `<n>s`, `<n>h` or `<n>d` into a duration.
pub fn parse_duration_arg(value: &str) -> anyhow::Result<Duration> {
    let value = value.trim();
    let Some(unit) = value.chars().last() else {
        bail!("empty duration");
    };
    let number = &value[..value.len() - unit.len_utf8()];
    let n: u64 = number
        .parse()
        .with_context(|| format!("invalid duration {value:?}: expected e.g. 86400s, 24h, 14d"))?;
    let scale = match unit {
        's' => 1,
        'h' => SECONDS_PER_HOUR,
        'd' => SECONDS_PER_DAY,
        other => bail!("unknown duration unit {other:?} in {value:?} (use s, h or d)"),
    };
    let secs = n
        .checked_mul(scale)
        .with_context(|| format!("duration {value:?} is too large"))?;
    Ok(Duration::from_secs(secs))
}

/// Render whole seconds the way the CLI accepts them back.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs != 0 && secs % SECONDS_PER_DAY == 0 {
        format!("{}d", secs / SECONDS_PER_DAY)
    } else if secs != 0 && secs % SECONDS_PER_HOUR == 0 {
        format!("{}h", secs / SECONDS_PER_HOUR)
    } else {
        format!("{secs}s")
    }
}
