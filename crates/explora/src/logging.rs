// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logging setup.
//!
//! The crate logs through the [`log`] facade. In the browser [`init`] routes records
//! to the developer console; elsewhere it leaves the choice of logger to the embedder.

use log::LevelFilter;

/// Level used by [`init`]: everything down to `debug` in debug builds, only
/// warnings and errors in release builds.
pub fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// Install the console logger. Calling it more than once, or after another logger
/// was installed, does nothing.
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console::init(default_level());
}

#[cfg(target_arch = "wasm32")]
mod console {
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use wasm_bindgen::JsValue;
    use web_sys::console;

    struct ConsoleLogger;

    static LOGGER: ConsoleLogger = ConsoleLogger;

    impl Log for ConsoleLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record) {
            if !self.enabled(record.metadata()) {
                return;
            }

            let line = JsValue::from_str(&format!("{}: {}", record.target(), record.args()));

            match record.level() {
                Level::Error => console::error_1(&line),
                Level::Warn => console::warn_1(&line),
                Level::Info => console::info_1(&line),
                Level::Debug | Level::Trace => console::debug_1(&line),
            }
        }

        fn flush(&self) {}
    }

    pub fn init(level: LevelFilter) {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(level);
        }
    }
}
