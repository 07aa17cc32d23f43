//! HTML message bodies (Telegram flavour; Discord converts them to markdown)

use crate::alerts::FailureCategory;
use crate::config::{ChannelKind, Config, SettingKey};
use crate::humanize::ByteSize;
use crate::replication::ReplicationReport;
use crate::status::{DailyReport, StatusSnapshot, local_time};
use chrono::NaiveDateTime;
use std::fmt::Write;
use std::time::SystemTime;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn gb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}

pub fn startup(config: &Config, now: NaiveDateTime) -> String {
    let mut msg = format!("<b>🚀 {} Started</b>\n\n", escape_html(&config.project_name));
    let _ = writeln!(msg, "Time: {}\n", now.format(TIME_FORMAT));
    let _ = writeln!(msg, "📸 Snapshot interval: {} seconds", config.capture_interval_secs);
    if config.remote.enabled {
        let _ = writeln!(
            msg,
            "☁️ Remote upload: every {} minutes",
            config.remote.upload_interval_minutes
        );
    } else {
        msg.push_str("☁️ Remote upload: disabled\n");
    }
    for kind in ChannelKind::ALL {
        let channel = config.channel(kind);
        if kind.is_ready(channel) {
            let _ = writeln!(
                msg,
                "📊 Daily report ({kind}): {:02}:00",
                channel.daily_report_hour
            );
        }
    }
    let _ = write!(msg, "🗑️ Retention: {} days", config.retention_days);
    msg
}

pub fn status(snapshot: &StatusSnapshot) -> String {
    let mut msg = String::from("<b>📊 Current Status</b>\n\n");
    let _ = writeln!(msg, "<b>Time:</b> {}\n", snapshot.at.format(TIME_FORMAT));
    msg.push_str("<b>Today's Stats:</b>\n");
    let _ = writeln!(msg, "• Snapshots today: {}", snapshot.today.count);
    let _ = writeln!(msg, "• Total size: {}\n", ByteSize(snapshot.today.total_bytes));
    msg.push_str("<b>System Health:</b>\n");
    push_disk(&mut msg, snapshot.disk.as_ref());
    msg.push_str("• Service: Running ✅");
    msg
}

fn push_disk(msg: &mut String, disk: Option<&crate::archive::DiskUsage>) {
    match disk {
        Some(disk) => {
            let _ = writeln!(msg, "• Disk free: {:.1} GB", gb(disk.free));
            let _ = writeln!(msg, "• Disk usage: {:.1}%", disk.used_percent());
        }
        None => msg.push_str("• Disk: unknown\n"),
    }
}

pub fn latest_caption(label: &str, modified: Option<SystemTime>) -> String {
    match modified {
        Some(time) => format!("📸 {label}\n{}", local_time(time).format(TIME_FORMAT)),
        None => format!("📸 {label}"),
    }
}

pub fn snapshot_caption(label: &str, at: NaiveDateTime) -> String {
    format!("📸 {label}\n{}", at.format(TIME_FORMAT))
}

pub fn daily_report(report: &DailyReport) -> String {
    let mut msg = format!("<b>📸 {} - Daily Report</b>\n\n", escape_html(&report.project));
    let _ = writeln!(msg, "<b>Date:</b> {}\n", report.date.format("%Y-%m-%d"));
    msg.push_str("<b>📊 Yesterday's Stats:</b>\n");
    let _ = writeln!(msg, "• Snapshots captured: {}", report.stats.count);
    let _ = writeln!(msg, "• Total size: {}", ByteSize(report.stats.total_bytes));
    let _ = writeln!(msg, "• Expected: {} snapshots\n", report.expected);

    msg.push_str("<b>💾 System Health:</b>\n");
    push_disk(&mut msg, report.disk.as_ref());
    let _ = writeln!(msg, "• Total archived days: {}", report.days_archived);
    let _ = writeln!(msg, "• Retention: {} days", report.retention_days);

    let mut notes = String::new();
    if report.below_expected() {
        let _ = writeln!(
            notes,
            "⚠️ <b>Warning:</b> Only {}/{} snapshots captured",
            report.stats.count, report.expected
        );
    }
    if let (true, Some(disk)) = (report.low_disk(), report.disk) {
        let _ = writeln!(
            notes,
            "⚠️ <b>Warning:</b> Low disk space ({:.1} GB free)",
            gb(disk.free)
        );
    }
    if report.stats.count == 0 {
        notes.push_str("❌ <b>Error:</b> No snapshots captured yesterday!\n");
    }
    if !notes.is_empty() {
        msg.push('\n');
        msg.push_str(&notes);
    }

    msg.trim_end().to_string()
}

pub fn alert(category: FailureCategory, at: NaiveDateTime, details: &str) -> String {
    let title = match category {
        FailureCategory::Capture => "Snapshot Error",
        FailureCategory::Upload => "Upload Error",
    };
    format!(
        "⚠️ <b>{title}</b>\n\nTime: {}\nDetails: {}",
        at.format(TIME_FORMAT),
        escape_html(details)
    )
}

pub fn upload_summary(report: &ReplicationReport) -> String {
    let mut msg = format!(
        "☁️ <b>Upload finished</b> ({})\n• Uploaded: {}\n• Already uploaded: {}\n• Failed: {}",
        escape_html(&report.remote_dir),
        report.uploaded,
        report.skipped,
        report.failed
    );
    if let Some(last) = report.last_error() {
        let _ = write!(
            msg,
            "\nLast error: {}: {}",
            escape_html(&last.file),
            escape_html(&last.error)
        );
    }
    msg
}

pub fn config_dump(rendered: &str) -> String {
    format!("<b>⚙️ Configuration</b>\n\n<code>{}</code>", escape_html(rendered))
}

pub fn help(config: &Config, kind: ChannelKind) -> String {
    let mut msg = format!("<b>🤖 {} Bot - Commands</b>\n\n", escape_html(&config.project_name));
    msg.push_str("<b>Available commands:</b>\n");
    msg.push_str("• <code>status</code> - Current status with latest photo\n");
    msg.push_str("• <code>photo</code> - Take and send a new snapshot now\n");
    msg.push_str("• <code>upload</code> - Upload today's snapshots now\n");
    msg.push_str("• <code>config</code> - Show the configuration\n");
    msg.push_str("• <code>set &lt;key&gt; &lt;value&gt;</code> - Change a setting\n");
    msg.push_str("• <code>reload</code> - Re-read the configuration file\n");
    msg.push_str("• <code>help</code> - Show this help message\n\n");

    msg.push_str("<b>Settings:</b>\n");
    for key in SettingKey::all() {
        let _ = writeln!(msg, "• <code>{key}</code> ({})", key.value_hint());
    }

    msg.push_str("\n<b>Automatic notifications:</b>\n");
    let _ = writeln!(
        msg,
        "• Daily report at {:02}:00",
        config.channel(kind).daily_report_hour
    );
    msg.push_str("• Error alerts\n");
    msg.push_str("• Startup notifications");
    msg
}

pub fn unknown(token: &str) -> String {
    format!(
        "❓ Unknown command: '{}'\n\nSend <code>help</code> to see available commands.",
        escape_html(token)
    )
}

pub fn error(text: &str) -> String {
    format!("❌ {}", escape_html(text))
}

pub fn test_message(config: &Config, now: NaiveDateTime) -> String {
    format!(
        "<b>🤖 {} Bot Test</b>\n\nNotifications are working.\nTime: {}",
        escape_html(&config.project_name),
        now.format(TIME_FORMAT)
    )
}
