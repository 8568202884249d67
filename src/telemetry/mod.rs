/// Telemetry ingestion
///
/// - `source`: the `TelemetrySource` trait and an mpsc-backed source
/// - `upstream`: WebSocket client for the meter event stream
/// - `synthetic`: random realistic payloads when no upstream is configured
/// - `pipeline`: decode, classify, window, broadcast and persist
pub mod pipeline;
pub mod source;
pub mod synthetic;
pub mod upstream;

pub use pipeline::{run_pipeline, PipelineStatsSnapshot, ProcessedSample, TelemetryPipeline};
pub use source::{ChannelSource, TelemetrySource};
pub use synthetic::SyntheticSource;
pub use upstream::UpstreamSource;
