/// Key layout of the `state` partition
///
/// - `cursor:commands` -> last processed command id (JSON)
/// - `sweep:last` -> date of the last retention sweep (JSON)
/// - `report:{channel}` -> date of the last daily report on that channel (JSON)
use crate::config::ChannelKind;

pub const STATE_PARTITION: &str = "state";

pub fn command_cursor_key() -> Vec<u8> {
    b"cursor:commands".to_vec()
}

pub fn last_sweep_key() -> Vec<u8> {
    b"sweep:last".to_vec()
}

/// Encode a daily-report key: report:{channel}
pub fn report_key(kind: ChannelKind) -> Vec<u8> {
    format!("report:{}", kind.name()).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_keys_are_per_channel() {
        assert_eq!(report_key(ChannelKind::Telegram), b"report:telegram");
        assert_ne!(report_key(ChannelKind::Telegram), report_key(ChannelKind::Discord));
    }
}
