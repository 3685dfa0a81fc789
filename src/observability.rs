use biometrics::{Collector, Counter, Moments};

pub(crate) static CHAT_REQUESTS: Counter = Counter::new("colloquy.chat.requests");
pub(crate) static CHAT_REQUEST_ERRORS: Counter = Counter::new("colloquy.chat.request_errors");
pub(crate) static CHAT_REQUEST_DURATION: Moments =
    Moments::new("colloquy.chat.request_duration_seconds");

pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("colloquy.stream.fragments");
pub(crate) static STREAM_SKIPPED_LINES: Counter = Counter::new("colloquy.stream.skipped_lines");
pub(crate) static STREAM_EMPTY: Counter = Counter::new("colloquy.stream.empty");

pub(crate) static THREADS_CREATED: Counter = Counter::new("colloquy.assistant.threads_created");
pub(crate) static THREADS_REUSED: Counter = Counter::new("colloquy.assistant.threads_reused");
pub(crate) static THREADS_DISCARDED: Counter =
    Counter::new("colloquy.assistant.threads_discarded");
pub(crate) static RUNS_STARTED: Counter = Counter::new("colloquy.assistant.runs_started");
pub(crate) static RUN_POLLS: Counter = Counter::new("colloquy.assistant.run_polls");
pub(crate) static RUN_FAILURES: Counter = Counter::new("colloquy.assistant.run_failures");
pub(crate) static RUN_DURATION: Moments = Moments::new("colloquy.assistant.run_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CHAT_REQUESTS);
    collector.register_counter(&CHAT_REQUEST_ERRORS);
    collector.register_moments(&CHAT_REQUEST_DURATION);

    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_SKIPPED_LINES);
    collector.register_counter(&STREAM_EMPTY);

    collector.register_counter(&THREADS_CREATED);
    collector.register_counter(&THREADS_REUSED);
    collector.register_counter(&THREADS_DISCARDED);
    collector.register_counter(&RUNS_STARTED);
    collector.register_counter(&RUN_POLLS);
    collector.register_counter(&RUN_FAILURES);
    collector.register_moments(&RUN_DURATION);
}
