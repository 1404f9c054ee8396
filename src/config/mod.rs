// Configuration: one explicit snapshot at startup, env over file over defaults.

pub mod loader;
pub mod types;

pub use loader::{CONFIG_FILE, apply_env, load};
pub use types::{Config, Endpoint, OnTimeout, WaitStrategy};
