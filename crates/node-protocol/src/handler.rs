//! Handler and completion-callback contracts (spec §4.5, §4.6).
//!
//! The source passes callbacks as a C function pointer plus an opaque
//! `void *context`. Rust closures already carry their own captured state,
//! so a handler here is just "something callable" — `context` disappears
//! as a separate parameter and becomes whatever the closure captured.
//!
//! Neither trait requires `Send`: the core this callback runs inside is a
//! single cooperative executor (spec §5) built on `Rc`, not `Arc`, and a
//! handler routinely closes over the tree handles that make it so.

use datahub_domain::value::SampleValue;

/// Invoked once per matching push, in push order (spec §4.4 step 5,
/// §5 "FIFO per resource ... for handler deliveries").
pub trait PushHandler {
    fn on_push(&mut self, timestamp: f64, value: &SampleValue);
}

impl<F> PushHandler for F
where
    F: FnMut(f64, &SampleValue),
{
    fn on_push(&mut self, timestamp: f64, value: &SampleValue) {
        self(timestamp, value)
    }
}

/// The outcome of an asynchronous buffer dump (spec §4.6 `read_json`,
/// §5 "Cancellation and timeouts").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionResult {
    Ok,
    /// The destination became unwritable, or the owning session was
    /// terminated while the dump was in flight.
    Failed,
}

/// Invoked exactly once when a `read_buffer_json` dump finishes or is
/// cancelled.
pub trait DumpCompletion {
    fn on_complete(&mut self, result: CompletionResult);
}

impl<F> DumpCompletion for F
where
    F: FnMut(CompletionResult),
{
    fn on_complete(&mut self, result: CompletionResult) {
        self(result)
    }
}
