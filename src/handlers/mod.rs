// Handler modules
pub mod add_otel;
pub mod batch;
pub mod cert_issuer;
pub mod report;

// Re-export handler entry points
pub use add_otel::{handle_add_otel, scan_and_fix_otel};
pub use batch::{
    BatchOptions, BatchOutcome, BatchTally, CommandReport, ItemResult, ItemStatus, PlannedChange,
    ScanSummary,
};
pub use cert_issuer::{handle_cert_issuer, scan_and_fix_cert_issuer};
pub use report::{ConsoleReporter, Reporter, SilentReporter};
