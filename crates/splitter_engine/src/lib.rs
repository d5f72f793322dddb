//! Stem splitter engine: separation API client and effect execution.
mod api;
mod engine;
mod persist;
mod playback;
mod timer;
mod types;

pub use api::{ApiSettings, ReqwestApi, SeparationApi, DEFAULT_API_BASE_URL};
pub use engine::{
    default_player, ChannelEventSink, EngineConfig, EngineError, EngineHandle, EventSink,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use playback::PlayerCommand;
pub use timer::{schedule_dismiss, PollTimer};
pub use types::{
    ApiError, EngineEvent, FailureKind, HealthResponse, JobId, JobRecord, MetricReading,
    StatusResponse, UploadReceipt, WireStatus,
};
