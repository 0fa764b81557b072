//! A simple logging library for the needs of Hills 'n Huts.

use std::fmt::Arguments;
use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering::Relaxed};

/// A verbosity level for a [`Message`].
///
/// Levels are ordered in *increasing verbosity*: [`Error`](Verbosity::Error) is the least
/// verbose, [`Trace`](Verbosity::Trace) the most. This is what makes filtering by level a
/// simple comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verbosity {
    /// Something prevents at least part of the program from working correctly.
    Error,
    /// The program recovered by itself, but something may be wrong.
    Warning,
    /// Progress information intended for the user.
    Info,
    /// Diagnostics only useful when debugging.
    Trace,
}

/// The most verbose level that will actually be written out.
static MAX_VERBOSITY: AtomicU8 = AtomicU8::new(Verbosity::Info as u8);

/// Sets the most verbose level that will actually be written out.
///
/// Messages more verbose than `max` are dropped by [`Message::log`].
pub fn set_max_verbosity(max: Verbosity) {
    MAX_VERBOSITY.store(max as u8, Relaxed);
}

/// Returns the most verbose level that will actually be written out.
pub fn max_verbosity() -> Verbosity {
    match MAX_VERBOSITY.load(Relaxed) {
        0 => Verbosity::Error,
        1 => Verbosity::Warning,
        2 => Verbosity::Info,
        _ => Verbosity::Trace,
    }
}

/// A message that can be logged.
pub struct Message<'a> {
    /// The name of the file in which the message was logged.
    pub file: &'static str,
    /// The line at which the message was logged.
    pub line: u32,
    /// The verbosity level of the message.
    pub verbosity: Verbosity,
    /// The message itself.
    pub message: Arguments<'a>,
}

impl<'a> Message<'a> {
    /// Logs this message to the standard error stream, unless it is filtered out by the
    /// current maximum verbosity.
    pub fn log(self) {
        if self.verbosity > max_verbosity() {
            return;
        }

        let prefix = match self.verbosity {
            Verbosity::Error => "\x1B[1;31mERROR\x1B[0m  ",
            Verbosity::Warning => "\x1B[1;33mWARNING\x1B[0m",
            Verbosity::Info => "\x1B[1;34mINFO\x1B[0m   ",
            Verbosity::Trace => "\x1B[1;30mTRACE\x1B[0m  ",
        };

        let _ = writeln!(
            std::io::stderr().lock(),
            "{prefix}{} \x1B[2;90m(at {}:{})\x1B[0m",
            self.message,
            self.file,
            self.line,
        );
    }
}

/// Logs a message with the current invoking location.
#[macro_export]
macro_rules! log {
    ($verbosity:expr, $($args:tt)*) => {
        $crate::Message::log($crate::Message {
            file: ::core::file!(),
            line: ::core::line!(),
            verbosity: $verbosity,
            message: ::core::format_args!($($args)*),
        })
    };
}

/// Logs a message with a verbosity level of [`Verbosity::Error`].
#[macro_export]
macro_rules! error {
    ($($args:tt)*) => {
        $crate::log!($crate::Verbosity::Error, $($args)*)
    };
}

/// Logs a message with a verbosity level of [`Verbosity::Warning`].
#[macro_export]
macro_rules! warning {
    ($($args:tt)*) => {
        $crate::log!($crate::Verbosity::Warning, $($args)*)
    };
}

/// Logs a message with a verbosity level of [`Verbosity::Info`].
#[macro_export]
macro_rules! info {
    ($($args:tt)*) => {
        $crate::log!($crate::Verbosity::Info, $($args)*)
    };
}

/// Logs a message with a verbosity level of [`Verbosity::Trace`].
#[macro_export]
macro_rules! trace {
    ($($args:tt)*) => {
        $crate::log!($crate::Verbosity::Trace, $($args)*)
    };
}
