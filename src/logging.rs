// Console logging for Memory Match BASE Core
//
// In the browser messages go to the devtools console through web-sys.
// Native builds (tests, tooling) write to stderr instead.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn label(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Write a single line tagged with the crate name
pub fn write(level: LogLevel, message: &str) {
    let line = format!("[memory-match] {} {}", level.label(), message);

    #[cfg(target_arch = "wasm32")]
    {
        let value = wasm_bindgen::JsValue::from_str(&line);
        match level {
            LogLevel::Info => web_sys::console::log_1(&value),
            LogLevel::Warn => web_sys::console::warn_1(&value),
            LogLevel::Error => web_sys::console::error_1(&value),
        }
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        eprintln!("{}", line);
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::write($crate::logging::LogLevel::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::write($crate::logging::LogLevel::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::write($crate::logging::LogLevel::Error, &format!($($arg)*))
    };
}
