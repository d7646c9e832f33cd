/*!

Logging interface. The public interface is the threshold getter/setter and the macros
`critical!`, `error!`, `warning!`, `info!`, `debug!`, and `trace!`; the backing
implementation is the [`tracing` crate](https://crates.io/crates/tracing).

The threshold is a small integer. A message is emitted when its level is at or below the
global threshold:

| level | macro       |
|------:|:------------|
|     0 | `critical!` |
|     1 | `error!`    |
|     2 | `warning!`  |
|     3 | `info!`     |
|     4 | `debug!`    |
|     5 | `trace!`    |

*/

use std::sync::atomic::{AtomicU8, Ordering};

static GLOBAL_LOGGING_THRESHOLD: AtomicU8 = AtomicU8::new(2);

#[inline(always)]
pub fn set_global_logging_threshold(threshold: u8) {
  GLOBAL_LOGGING_THRESHOLD.store(threshold, Ordering::Relaxed);
}

#[inline(always)]
pub fn get_global_logging_threshold() -> u8 {
  GLOBAL_LOGGING_THRESHOLD.load(Ordering::Relaxed)
}

/// Installs a `tracing` collector that prints to stderr. Intended for tests and examples; a
/// host application will normally install its own subscriber instead. Safe to call more than
/// once (subsequent calls are no-ops).
pub fn init_test_logging() {
  use tracing_subscriber::fmt;
  let _ = fmt()
    .with_max_level(tracing::level_filters::LevelFilter::TRACE)
    .with_writer(std::io::stderr)
    .with_test_writer()
    .try_init();
}

#[macro_export]
macro_rules! critical {
  ($($arg:tt)*) => {
    $crate::tracing::error!($($arg)*)
  };
}

#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => {
    if $crate::log::get_global_logging_threshold() >= 1 {
      $crate::tracing::error!($($arg)*)
    }
  };
}

#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => {
    if $crate::log::get_global_logging_threshold() >= 2 {
      $crate::tracing::warn!($($arg)*)
    }
  };
}

#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => {
    if $crate::log::get_global_logging_threshold() >= 3 {
      $crate::tracing::info!($($arg)*)
    }
  };
}

#[macro_export]
macro_rules! debug {
  ($($arg:tt)*) => {
    if $crate::log::get_global_logging_threshold() >= 4 {
      $crate::tracing::debug!($($arg)*)
    }
  };
}

#[macro_export]
macro_rules! trace {
  ($($arg:tt)*) => {
    if $crate::log::get_global_logging_threshold() >= 5 {
      $crate::tracing::trace!($($arg)*)
    }
  };
}
