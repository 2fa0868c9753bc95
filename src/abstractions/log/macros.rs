//! Macros for generating log messages.
//!
//! Every level macro accepts three forms:
//!
//! ```ignore
//! level!(threshold; field = value, ...; "format string", args...);
//! level!(threshold, "format string", args...);
//! level!("format string", args...);
//! ```

#[doc(hidden)]
#[macro_export]
macro_rules! __log_event {
    ($level:expr, $threshold:expr; $($field:ident = $value:expr),+; $($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::log::tracing::event!(
                $level,
                threshold = $threshold,
                $($field = $value,)+
                message = format_args!($($arg)+)
            );
        }
    };
    ($level:expr, $threshold:expr, $($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::log::tracing::event!(
                $level,
                threshold = $threshold,
                message = format_args!($($arg)+)
            );
        }
    };
}

#[macro_export]
macro_rules! critical {
    ($threshold:expr; $($field:ident = $value:expr),+; $($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::log::tracing::event!(
                $crate::log::tracing::Level::ERROR,
                critical = true,
                threshold = $threshold,
                $($field = $value,)+
                message = format_args!($($arg)+)
            );
        }
    };
    ($threshold:expr, $($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::log::tracing::event!(
                $crate::log::tracing::Level::ERROR,
                critical = true,
                threshold = $threshold,
                message = format_args!($($arg)+)
            );
        }
    };
    ($($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::log::tracing::event!(
                $crate::log::tracing::Level::ERROR,
                critical = true,
                threshold = 0,
                message = format_args!($($arg)+)
            );
        }
    };
}

#[macro_export]
macro_rules! error {
    ($threshold:expr; $($field:ident = $value:expr),+; $($arg:tt)+) => {
        $crate::__log_event!($crate::log::tracing::Level::ERROR, $threshold; $($field = $value),+; $($arg)+)
    };
    ($threshold:expr, $($arg:tt)+) => {
        $crate::__log_event!($crate::log::tracing::Level::ERROR, $threshold, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log_event!($crate::log::tracing::Level::ERROR, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! warning {
    ($threshold:expr; $($field:ident = $value:expr),+; $($arg:tt)+) => {
        $crate::__log_event!($crate::log::tracing::Level::WARN, $threshold; $($field = $value),+; $($arg)+)
    };
    ($threshold:expr, $($arg:tt)+) => {
        $crate::__log_event!($crate::log::tracing::Level::WARN, $threshold, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log_event!($crate::log::tracing::Level::WARN, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($threshold:expr; $($field:ident = $value:expr),+; $($arg:tt)+) => {
        $crate::__log_event!($crate::log::tracing::Level::INFO, $threshold; $($field = $value),+; $($arg)+)
    };
    ($threshold:expr, $($arg:tt)+) => {
        $crate::__log_event!($crate::log::tracing::Level::INFO, $threshold, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log_event!($crate::log::tracing::Level::INFO, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($threshold:expr; $($field:ident = $value:expr),+; $($arg:tt)+) => {
        $crate::__log_event!($crate::log::tracing::Level::DEBUG, $threshold; $($field = $value),+; $($arg)+)
    };
    ($threshold:expr, $($arg:tt)+) => {
        $crate::__log_event!($crate::log::tracing::Level::DEBUG, $threshold, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log_event!($crate::log::tracing::Level::DEBUG, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! trace {
    ($threshold:expr; $($field:ident = $value:expr),+; $($arg:tt)+) => {
        $crate::__log_event!($crate::log::tracing::Level::TRACE, $threshold; $($field = $value),+; $($arg)+)
    };
    ($threshold:expr, $($arg:tt)+) => {
        $crate::__log_event!($crate::log::tracing::Level::TRACE, $threshold, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log_event!($crate::log::tracing::Level::TRACE, 0, $($arg)+)
    };
}


// The following makes the macros importable directly from the `log` module.
pub use {critical, error, warning, info, debug, trace};
