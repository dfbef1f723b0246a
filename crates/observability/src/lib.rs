//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式，`RUST_LOG` 优先)
//! - Prometheus 指标导出，安装时登记指标说明与单位
//! - 曝光、帘幕行程、发布链路与 sink 投递指标
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{LogFormat, ObservabilityConfig};
//!
//! let config = ObservabilityConfig {
//!     log_format: LogFormat::Json,
//!     metrics_port: Some(9464),
//!     ..ObservabilityConfig::from_verbosity(false, 1)
//! };
//! observability::init_with_config(config)?;
//!
//! observability::record_exposure(ChannelId::Two, &exposure);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    describe_metrics, record_edge_count, record_exposure, record_join_discarded,
    record_publish_backpressure, record_rejected_interval, record_sink_coalesced,
    record_sink_render, record_snapshot_published, record_travel,
};

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// 未设置 `RUST_LOG` 时的日志级别
    pub level: Level,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Compact,
            level: Level::INFO,
            metrics_port: None,
        }
    }
}

impl ObservabilityConfig {
    /// 由命令行 `-q` / `-v` 计数得到日志级别
    pub fn from_verbosity(quiet: bool, verbose: u8) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => Level::WARN,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        };
        Self {
            level,
            ..Self::default()
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_lowercase()))
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志，每行一个事件
    Json,
    /// 多行人类可读格式
    Pretty,
    /// 紧凑单行格式
    #[default]
    Compact,
}

/// 初始化 Tracing，并按需安装 Prometheus 导出器
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    // 测量循环运行在 blocking 线程上，线程名有助于区分
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_thread_names(true)
            .with_current_span(false)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_thread_names(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(config.filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        level = %config.level,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// 仅安装 Prometheus 导出器（Tracing 已初始化时使用）
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on port {port}"))?;
    describe_metrics();

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
