pub mod aggregator;
pub mod checker;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extractor;
pub mod frontier;
pub mod normalize;
pub mod result;
pub mod sink;
pub mod visited;

pub use config::ScanConfig;
pub use crawler::{ProgressCallback, Scanner};
pub use error::ScanError;
pub use result::{LinkOutcome, LinkStatus, RequesterId, ScanResult, Termination};
pub use sink::{PersistReport, ResultSink, persist_all};
