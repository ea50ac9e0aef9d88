//! Fixtures for building small, fast test benches.

use std::io::Write;

use tbsim_core::config::{Config, MemoryConfig};
use tbsim_core::{ConsoleSink, Driver, MemoryImage, SimModel};
use tempfile::NamedTempFile;

/// Image size used by most tests (256 bytes).
pub const RAM_WORDS: usize = 64;
/// Program region capacity in the small layout.
pub const PROGRAM_WORDS: usize = 48;
/// Descriptor region capacity in the small layout.
pub const DESCRIPTOR_WORDS: usize = 16;

/// Routes `tracing` output to the test harness' captured stdout.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Writes `data` to a temporary file that lives as long as the handle.
pub fn temp_image(data: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(data).unwrap();
    file.flush().unwrap();
    file
}

/// The small layout with a step budget of `max_time`.
pub fn small_config(max_time: u64) -> Config {
    let mut config = Config {
        memory: MemoryConfig::with_layout(RAM_WORDS, PROGRAM_WORDS, DESCRIPTOR_WORDS),
        ..Config::default()
    };
    config.run.max_time = max_time;
    config
}

/// A driver over a fresh image, capturing console output in memory.
pub fn bench<M: SimModel>(model: M, config: &Config) -> Driver<M, Vec<u8>> {
    init_tracing();
    let memory = MemoryImage::from_config(&config.memory);
    Driver::new(model, memory, ConsoleSink::new(Vec::new()), config)
}

/// Console bytes flushed so far, as text.
pub fn console_text<M: SimModel>(driver: &Driver<M, Vec<u8>>) -> String {
    String::from_utf8_lossy(driver.console().get_ref()).into_owned()
}
