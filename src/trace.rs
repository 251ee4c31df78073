//! Logging hooks that disappear unless the `tracing` feature is on.
//!
//! Spans wrap `aggregate`, `match_template` and `tick`. Info events carry
//! candidate counts; per-tick capture problems are warnings and a driver
//! stopping on failure is an error.

#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::DisabledSpan
    };
}

/// Named info event with `key = value` fields.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:expr $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(name: $name $(, $key = $value)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $(let _ = $value;)*
    };
}

/// Level-dispatched message in `tracing` field syntax.
#[cfg(feature = "tracing")]
macro_rules! trace_at {
    (warn, $($arg:tt)+) => {
        tracing::warn!($($arg)+)
    };
    (error, $($arg:tt)+) => {
        tracing::error!($($arg)+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_at {
    ($level:ident, $($arg:tt)+) => {};
}

macro_rules! trace_warn {
    ($($arg:tt)+) => {
        $crate::trace::trace_at!(warn, $($arg)+)
    };
}

macro_rules! trace_error {
    ($($arg:tt)+) => {
        $crate::trace::trace_at!(error, $($arg)+)
    };
}

pub(crate) use trace_at;
pub(crate) use trace_error;
pub(crate) use trace_event;
pub(crate) use trace_span;
pub(crate) use trace_warn;

/// Stand-in for `tracing::Span` so `trace_span!(..).entered()` compiles
/// either way.
#[cfg(not(feature = "tracing"))]
pub(crate) struct DisabledSpan;

#[cfg(not(feature = "tracing"))]
impl DisabledSpan {
    #[inline]
    pub(crate) fn entered(self) -> Self {
        self
    }
}
