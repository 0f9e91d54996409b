use chrono::Local;
use log::{max_level, LevelFilter, Metadata, Record, SetLoggerError};

pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

static LOGGER: StdLogger = StdLogger;

pub struct StdLogger;

impl log::Log for StdLogger {
  fn enabled(&self, metadata: &Metadata) -> bool {
    metadata.level() <= max_level()
  }

  fn log(&self, record: &Record) {
    if self.enabled(record.metadata()) {
      let time_str = Local::now().format("%Y-%m-%dT%H:%M:%S");
      println!("{0} {1:<8}[{2}] {3}", time_str, record.level(), record.target(), record.args())
    }
  }

  fn flush(&self) {}
}

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
  log::set_logger(&LOGGER)?;
  log::set_max_level(level);
  Ok(())
}

/// Accepts the `log` level names in any case; anything else yields `None`.
pub fn parse_level(value: &str) -> Option<LevelFilter> {
  value.trim().parse::<LevelFilter>().ok()
}
