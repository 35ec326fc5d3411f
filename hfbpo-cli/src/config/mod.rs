mod loader;

pub use loader::{ConfigLoader, FIXED_TOPIC_ENV};
