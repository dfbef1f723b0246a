//! 配置校验模块
//!
//! 校验规则：
//! - min_interval_us >= 1
//! - min_interval_us <= max_interval_us
//! - sink 名称非空且唯一
//! - queue_capacity > 0
//! - json_lines sink 的 target/path 参数合法

use std::collections::HashSet;

use contracts::{BenchBlueprint, ContractError, SinkConfig, SinkType};

/// 校验 BenchBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &BenchBlueprint) -> Result<(), ContractError> {
    validate_interval_bounds(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// 校验区间合法范围
fn validate_interval_bounds(blueprint: &BenchBlueprint) -> Result<(), ContractError> {
    let measurement = &blueprint.measurement;

    if measurement.min_interval_us == 0 {
        return Err(ContractError::config_validation(
            "measurement.min_interval_us",
            "min_interval_us must be >= 1 (zero-length intervals have no reciprocal)",
        ));
    }

    if measurement.min_interval_us > measurement.max_interval_us {
        return Err(ContractError::config_validation(
            "measurement.min_interval_us / measurement.max_interval_us",
            format!(
                "min_interval_us ({}) must be <= max_interval_us ({})",
                measurement.min_interval_us, measurement.max_interval_us
            ),
        ));
    }

    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(blueprint: &BenchBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
        validate_sink_params(sink)?;
    }
    Ok(())
}

/// 校验 sink 类型相关参数
fn validate_sink_params(sink: &SinkConfig) -> Result<(), ContractError> {
    if sink.sink_type != SinkType::JsonLines {
        return Ok(());
    }

    match sink.params.get("target").map(String::as_str) {
        None | Some("stdout") | Some("stderr") => Ok(()),
        Some("file") if sink.params.get("path").is_some_and(|p| !p.is_empty()) => Ok(()),
        Some("file") => Err(ContractError::config_validation(
            format!("sinks[{}].params.path", sink.name),
            "target 'file' requires a non-empty 'path'",
        )),
        Some(other) => Err(ContractError::config_validation(
            format!("sinks[{}].params.target", sink.name),
            format!("unknown target '{other}', expected stdout, stderr or file"),
        )),
    }
}
