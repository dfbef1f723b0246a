//! 测量指标收集模块
//!
//! 记录曝光、帘幕行程、发布链路与 sink 投递的运行指标。
//! 只做即时记录，不保留测量历史。

use contracts::{ChannelId, CurtainTravel, Exposure};
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};

/// 记录一次通过校验的曝光
pub fn record_exposure(channel: ChannelId, exposure: &Exposure) {
    let channel = channel.to_string();
    counter!("shutter_tester_exposures_total", "channel" => channel.clone()).increment(1);
    gauge!("shutter_tester_exposure_ms", "channel" => channel.clone()).set(exposure.duration_ms);
    histogram!("shutter_tester_exposure_ms_hist", "channel" => channel).record(exposure.duration_ms);
}

/// 记录一次帘幕行程计算
pub fn record_travel(travel: &CurtainTravel) {
    counter!("shutter_tester_travel_total").increment(1);
    gauge!("shutter_tester_leading_travel_ms").set(travel.leading_ms);
    gauge!("shutter_tester_trailing_travel_ms").set(travel.trailing_ms);
    histogram!("shutter_tester_leading_travel_ms_hist").record(travel.leading_ms);
    histogram!("shutter_tester_trailing_travel_ms_hist").record(travel.trailing_ms);
}

/// 记录被拒绝的区间 (零长度/过短/过长)
pub fn record_rejected_interval(channel: ChannelId, reason: &'static str) {
    counter!(
        "shutter_tester_intervals_rejected_total",
        "channel" => channel.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// 记录因超时丢弃的行程配对
pub fn record_join_discarded(channel: ChannelId) {
    counter!(
        "shutter_tester_joins_discarded_total",
        "channel" => channel.to_string()
    )
    .increment(1);
}

/// 记录快照发布
pub fn record_snapshot_published(sequence: u64) {
    counter!("shutter_tester_snapshots_published_total").increment(1);
    gauge!("shutter_tester_last_sequence").set(sequence as f64);
}

/// 记录发布背压 (队列已满，下次迭代重试)
pub fn record_publish_backpressure() {
    counter!("shutter_tester_publish_backpressure_total").increment(1);
}

/// 记录通道边沿计数
pub fn record_edge_count(channel: ChannelId, edges: u64) {
    gauge!(
        "shutter_tester_edges",
        "channel" => channel.to_string()
    )
    .set(edges as f64);
}

/// 记录 sink 渲染结果
pub fn record_sink_render(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "shutter_tester_sink_renders_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录 sink 落后时被合并的快照
pub fn record_sink_coalesced(sink_name: &str) {
    counter!(
        "shutter_tester_sink_coalesced_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// 向当前 recorder 登记指标说明与单位
pub fn describe_metrics() {
    describe_counter!(
        "shutter_tester_exposures_total",
        Unit::Count,
        "Exposures accepted per channel"
    );
    describe_gauge!(
        "shutter_tester_exposure_ms",
        Unit::Milliseconds,
        "Latest exposure per channel"
    );
    describe_histogram!(
        "shutter_tester_exposure_ms_hist",
        Unit::Milliseconds,
        "Accepted exposures per channel"
    );
    describe_counter!(
        "shutter_tester_travel_total",
        Unit::Count,
        "Curtain travel results computed"
    );
    describe_gauge!(
        "shutter_tester_leading_travel_ms",
        Unit::Milliseconds,
        "Latest leading curtain travel"
    );
    describe_gauge!(
        "shutter_tester_trailing_travel_ms",
        Unit::Milliseconds,
        "Latest trailing curtain travel"
    );
    describe_histogram!(
        "shutter_tester_leading_travel_ms_hist",
        Unit::Milliseconds,
        "Leading curtain travel results"
    );
    describe_histogram!(
        "shutter_tester_trailing_travel_ms_hist",
        Unit::Milliseconds,
        "Trailing curtain travel results"
    );
    describe_counter!(
        "shutter_tester_intervals_rejected_total",
        Unit::Count,
        "Intervals outside the accepted bounds, by channel and reason"
    );
    describe_counter!(
        "shutter_tester_joins_discarded_total",
        Unit::Count,
        "Outer-channel intervals that expired before their partner arrived"
    );
    describe_counter!(
        "shutter_tester_snapshots_published_total",
        Unit::Count,
        "Snapshots handed to the dispatcher"
    );
    describe_gauge!(
        "shutter_tester_last_sequence",
        "Sequence number of the latest published snapshot"
    );
    describe_counter!(
        "shutter_tester_publish_backpressure_total",
        Unit::Count,
        "Publish attempts deferred because the dispatcher queue was full"
    );
    describe_gauge!(
        "shutter_tester_edges",
        Unit::Count,
        "Level changes seen per channel"
    );
    describe_counter!(
        "shutter_tester_sink_renders_total",
        Unit::Count,
        "Sink renders by sink and status"
    );
    describe_counter!(
        "shutter_tester_sink_coalesced_total",
        Unit::Count,
        "Snapshots folded into a newer one while a sink was behind"
    );
}
