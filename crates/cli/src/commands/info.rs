//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{BenchBlueprint, PublishPolicy};

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    channels: ChannelsInfo,
    measurement: MeasurementInfo,
    publish: PublishInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct ChannelsInfo {
    polarity: String,
}

#[derive(Serialize)]
struct MeasurementInfo {
    min_interval_us: u32,
    max_interval_us: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    join_staleness_us: Option<u32>,
}

#[derive(Serialize)]
struct PublishInfo {
    policy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    idle_threshold: Option<u32>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    params: std::collections::HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &BenchBlueprint, args: &InfoArgs) -> ConfigInfo {
    let cycle = blueprint.to_cycle_config();

    let publish = match cycle.publish {
        PublishPolicy::Immediate => PublishInfo {
            policy: "immediate".to_string(),
            idle_threshold: None,
        },
        PublishPolicy::Debounced { idle_threshold } => PublishInfo {
            policy: "debounced".to_string(),
            idle_threshold: Some(idle_threshold),
        },
    };

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
                params: s.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        channels: ChannelsInfo {
            polarity: format!("{:?}", blueprint.channels.polarity),
        },
        measurement: MeasurementInfo {
            min_interval_us: cycle.interval.min_us,
            max_interval_us: cycle.interval.max_us,
            join_staleness_us: cycle.join.staleness_us,
        },
        publish,
        sinks,
    }
}

fn print_config_info(blueprint: &BenchBlueprint, args: &InfoArgs) {
    let cycle = blueprint.to_cycle_config();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Shutter Tester Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🔦 Channels");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   └─ Line polarity: {:?}", blueprint.channels.polarity);

    println!("\n📏 Measurement");
    println!(
        "   ├─ Accepted interval: {} µs ..= {} µs",
        cycle.interval.min_us, cycle.interval.max_us
    );
    match cycle.join.staleness_us {
        Some(staleness) => println!("   └─ Travel join staleness: {} µs", staleness),
        None => println!("   └─ Travel join staleness: (never discard)"),
    }

    println!("\n⚙️  Publish");
    match cycle.publish {
        PublishPolicy::Immediate => println!("   └─ Policy: immediate"),
        PublishPolicy::Debounced { idle_threshold } => {
            println!("   ├─ Policy: debounced");
            println!("   └─ Idle threshold: {} iterations", idle_threshold);
        }
    }

    if !blueprint.sinks.is_empty() {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            if args.sinks {
                println!(
                    "   {} {} ({:?}, queue {}) {:?}",
                    prefix, sink.name, sink.sink_type, sink.queue_capacity, sink.params
                );
            } else {
                println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);
            }
        }
    }

    println!();
}
