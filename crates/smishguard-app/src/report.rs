//! Plain-text rendering for command output.

use smishguard_core::alerts::create_preview;
use smishguard_core::{AppStats, PlatformKind, ScanRecord};
use smishguard_monitor::MonitoringStatus;

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// "PHISHING" or "SAFE".
pub fn verdict_label(record: &ScanRecord) -> &'static str {
    if record.result.is_phishing {
        "PHISHING"
    } else {
        "SAFE"
    }
}

/// Full report for a single scan.
pub fn format_record(record: &ScanRecord) -> String {
    let mut out = format!(
        "[{}] {} ({})\n  message: {}\n",
        verdict_label(record),
        record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        record.language,
        record.message
    );

    if !record.result.key_indicators.is_empty() {
        out.push_str(&format!(
            "  indicators: {}\n",
            record.result.key_indicators.join(", ")
        ));
    }
    out.push_str(&format!("  details: {}\n", record.result.analysis_details));
    out.push_str(&format!(
        "  recommendation: {}",
        record.result.security_recommendation
    ));
    out
}

/// One-line summary used in history listings.
pub fn format_history_line(record: &ScanRecord) -> String {
    format!(
        "{}  {:<8}  {}",
        record.timestamp.format("%Y-%m-%d %H:%M"),
        verdict_label(record),
        create_preview(&record.message)
    )
}

pub fn format_stats(stats: &AppStats) -> String {
    format!(
        "Total scans:    {}\nThreats found:  {}\nSafe messages:  {}",
        stats.total_scans, stats.threats_found, stats.safe_messages
    )
}

pub fn format_status(status: &MonitoringStatus, platform: PlatformKind) -> String {
    let mut out = format!(
        "State:                {} ({})\nPlatform:             {}\nMonitoring enabled:   {}\n",
        status.state,
        status.state.description(),
        platform,
        yes_no(status.monitoring_enabled)
    );
    if platform.requires_listener() {
        out.push_str(&format!(
            "Notification access:  {}\n",
            yes_no(status.listener_enabled)
        ));
    }
    out.push_str(&format!(
        "Notification permission: {}\nReady:                {}",
        yes_no(status.has_permissions),
        yes_no(status.is_active)
    ));
    out
}
