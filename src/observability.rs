use biometrics::{Collector, Counter};

pub(crate) static CLIENT_EXCHANGES: Counter = Counter::new("parley.client.exchanges");
pub(crate) static CLIENT_EXCHANGE_FAILURES: Counter =
    Counter::new("parley.client.exchange_failures");

pub(crate) static STREAM_LINES: Counter = Counter::new("parley.stream.lines");
pub(crate) static STREAM_BYTES: Counter = Counter::new("parley.stream.bytes");
pub(crate) static STREAM_PARSE_ERRORS: Counter = Counter::new("parley.stream.parse_errors");

pub(crate) static HISTORY_COMMITS: Counter = Counter::new("parley.history.commits");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_EXCHANGES);
    collector.register_counter(&CLIENT_EXCHANGE_FAILURES);

    collector.register_counter(&STREAM_LINES);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_PARSE_ERRORS);

    collector.register_counter(&HISTORY_COMMITS);
}
