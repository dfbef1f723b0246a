//! # Dispatcher
//!
//! 测量结果分发模块。
//!
//! 负责：
//! - 消费 `MeasurementSnapshot`
//! - Fan-out 到多个 sinks
//! - 隔离慢 sink，不阻塞测量轮询
//! - sink 落后时合并快照，只渲染最新状态，不丢测量值
//! - 为轮询线程提供非阻塞的 `SnapshotSender`

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod mailbox;
pub mod metrics;
pub mod publisher;
pub mod sinks;

pub use contracts::{MeasurementSnapshot, ResultsSink};
pub use dispatcher::{create_dispatcher, Dispatcher};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use mailbox::{Delivery, Mailbox};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use publisher::{snapshot_channel, SnapshotSender};
pub use sinks::{JsonLinesSink, JsonLinesTarget, LogSink};
