//! Browser build support. There is no filesystem to read the catalog from, so it is compiled into
//! the binary; installing a panic hook pipes panic messages into the browser console.

pub const EMBEDDED_CATALOG: &str = include_str!("../assets/levels.json");

#[cfg(feature = "web")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}
