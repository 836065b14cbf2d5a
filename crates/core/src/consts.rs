//! Core constants.

/// The crate name string constant.
pub static YFIN_NAME: &str = "yfin-go";

/// The crate version string read from `Cargo.toml` at compile time.
pub static YFIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A realistic browser-style User-Agent string, distinct from the library's own
/// identity. The transport impersonates an ordinary browser; it does not announce
/// itself as a scraper.
pub static YFIN_DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
