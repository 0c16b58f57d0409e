//! Call-site convenience macros.
//!
//! Each macro takes a [`Logger`](crate::Logger) (or anything that derefs to
//! one), an optional `tag = expr,` and `format!` arguments. The file, module
//! path, line and current time are captured automatically.
//!
//! ```
//! use logweave_core::{log_info, Logger};
//!
//! let logger = Logger::new();
//! log_info!(logger, tag = "Startup", "listening on {}", 8080);
//! ```

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($level:expr, $logger:expr, tag = $tag:expr, $($arg:tt)+) => {
        $logger.log(
            $level,
            ::std::format!($($arg)+),
            $crate::LogContext::now()
                .with_tag($tag)
                .with_location(::std::file!(), ::std::module_path!(), ::std::line!()),
        )
    };
    ($level:expr, $logger:expr, $($arg:tt)+) => {
        $logger.log(
            $level,
            ::std::format!($($arg)+),
            $crate::LogContext::now()
                .with_location(::std::file!(), ::std::module_path!(), ::std::line!()),
        )
    };
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::__log_at!($crate::LogLevel::Debug, $logger, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::__log_at!($crate::LogLevel::Info, $logger, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::__log_at!($crate::LogLevel::Warning, $logger, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::__log_at!($crate::LogLevel::Error, $logger, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::__log_at!($crate::LogLevel::Critical, $logger, $($arg)+)
    };
}
