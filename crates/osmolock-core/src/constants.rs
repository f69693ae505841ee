/// ─── Osmolock Constants ─────────────────────────────────────────────────────
///
/// Values shared by the query layer, the LCD transport and the CLI.

// ── REST paths ───────────────────────────────────────────────────────────────

/// Path prefix of the lockup module's "locked longer than duration" query.
/// The account address is appended as the final path segment.
pub const ACCOUNT_LOCKED_LONGER_DURATION_PATH: &str =
    "/osmosis/lockup/v1beta1/account_locked_longer_duration";

/// Build the REST path for one account.
pub fn account_locked_longer_duration_path(address: &str) -> String {
    format!("{ACCOUNT_LOCKED_LONGER_DURATION_PATH}/{address}")
}

// ── Chain defaults ───────────────────────────────────────────────────────────

/// Default chain id used by the CLI.
pub const DEFAULT_CHAIN_ID: &str = "osmosis-1";

/// Default public REST (LCD) endpoint.
pub const DEFAULT_LCD_URL: &str = "https://lcd.osmosis.zone";

/// Default HTTP timeout for LCD requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ── Durations ────────────────────────────────────────────────────────────────

pub const SECONDS_PER_HOUR: u64 = 3_600;
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Bonding durations offered by the chain's incentivized pools (1d, 7d, 14d).
pub const BONDING_DURATIONS_SECS: [u64; 3] =
    [SECONDS_PER_DAY, 7 * SECONDS_PER_DAY, 14 * SECONDS_PER_DAY];

// ── Timestamps ───────────────────────────────────────────────────────────────

/// The zero timestamp the chain reports for locks that are not unlocking.
pub const UNSET_END_TIME: &str = "0001-01-01T00:00:00Z";
