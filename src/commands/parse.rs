/// A parsed chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Photo,
    Config,
    Set { key: String, value: String },
    /// `set` without a key
    SetUsage,
    Reload,
    Upload,
    Help,
    Unknown(String),
}

/// Parse a message into a command.
///
/// The command word is matched case-insensitively after stripping a leading
/// `/` or `!` and any `@botname` suffix. Arguments keep their case.
pub fn parse(text: &str) -> Command {
    let text = text.trim();
    let (head, rest) = match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    };

    let word = head.trim_start_matches(['/', '!']);
    let word = word.split_once('@').map_or(word, |(word, _)| word);

    match word.to_lowercase().as_str() {
        "" | "help" | "start" => Command::Help,
        "status" => Command::Status,
        "photo" | "snapshot" => Command::Photo,
        "config" => Command::Config,
        "reload" => Command::Reload,
        "upload" => Command::Upload,
        "set" => parse_set(rest),
        _ => Command::Unknown(head.to_string()),
    }
}

fn parse_set(args: &str) -> Command {
    if args.is_empty() {
        return Command::SetUsage;
    }
    let (key, value) = match args.split_once(char::is_whitespace) {
        Some((key, value)) => (key, value.trim()),
        None => (args, ""),
    };
    Command::Set {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_words() {
        assert_eq!(parse("status"), Command::Status);
        assert_eq!(parse("/STATUS"), Command::Status);
        assert_eq!(parse("!photo"), Command::Photo);
        assert_eq!(parse("/snapshot@lapse_bot"), Command::Photo);
        assert_eq!(parse("  Reload  "), Command::Reload);
        assert_eq!(parse("/start"), Command::Help);
        assert_eq!(parse(""), Command::Help);
        assert_eq!(parse("/"), Command::Help);
    }

    #[test]
    fn test_set_arguments() {
        assert_eq!(
            parse("/set telegram.message-template <b>{project}</b> {count}"),
            Command::Set {
                key: "telegram.message-template".to_string(),
                value: "<b>{project}</b> {count}".to_string(),
            }
        );
        assert_eq!(
            parse("set retention   30"),
            Command::Set {
                key: "retention".to_string(),
                value: "30".to_string(),
            }
        );
        assert_eq!(parse("/set"), Command::SetUsage);
        assert_eq!(
            parse("/set discord.hours"),
            Command::Set {
                key: "discord.hours".to_string(),
                value: String::new(),
            }
        );
    }

    #[test]
    fn test_unknown_echoes_token() {
        assert_eq!(
            parse("/frobnicate now"),
            Command::Unknown("/frobnicate".to_string())
        );
    }
}
