pub mod constants;
pub mod currency;
pub mod error;
pub mod lock;
pub mod types;

pub use constants::*;
pub use currency::{CoinPretty, Currency};
pub use error::LockupError;
pub use lock::{parse_amount, parse_duration_secs, parse_end_time, AccountLock, LockStatus};
pub use types::*;
