pub mod health;
pub use self::health::health;

pub mod authenticate;
pub use self::authenticate::authenticate;

pub mod pin_entry;
pub use self::pin_entry::{pin_entry, pin_submit};

// common functions for the handlers
use regex::Regex;

/// A PIN is 4 to 8 ASCII digits.
pub fn valid_pin(pin: &str) -> bool {
    Regex::new(r"^[0-9]{4,8}$").map_or(false, |re| re.is_match(pin))
}
