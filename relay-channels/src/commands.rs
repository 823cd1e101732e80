//! Inbound text classification: bot commands versus chat.

/// A recognised bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    /// `/setngrok <url>`; the argument is absent when the user sent none.
    SetEndpoint(Option<String>),
    Status,
    Help,
    Reset,
}

/// What to do with one inbound text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    Chat(String),
    /// Unknown commands and blank text get no reply.
    Ignored,
}

/// Classify an inbound text.
///
/// Commands may carry an `@botname` suffix (`/status@advi_bot`) and match
/// case-insensitively. Only the first argument of `/setngrok` is used.
pub fn parse(text: &str) -> Inbound {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Inbound::Ignored;
    }

    let Some(body) = trimmed.strip_prefix('/') else {
        return Inbound::Chat(text.to_string());
    };

    let mut parts = body.split_whitespace();
    let head = parts.next().unwrap_or_default();
    let name = head.split('@').next().unwrap_or_default().to_ascii_lowercase();

    let command = match name.as_str() {
        "start" => Command::Start,
        "setngrok" => Command::SetEndpoint(parts.next().map(str::to_string)),
        "status" => Command::Status,
        "help" => Command::Help,
        "reset" => Command::Reset,
        _ => return Inbound::Ignored,
    };

    Inbound::Command(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(parse("hello Advi"), Inbound::Chat("hello Advi".into()));
    }

    #[test]
    fn test_chat_text_kept_verbatim() {
        assert_eq!(parse("  spaced out  "), Inbound::Chat("  spaced out  ".into()));
    }

    #[test]
    fn test_known_commands() {
        assert_eq!(parse("/start"), Inbound::Command(Command::Start));
        assert_eq!(parse("/status"), Inbound::Command(Command::Status));
        assert_eq!(parse("/help"), Inbound::Command(Command::Help));
        assert_eq!(parse("/reset"), Inbound::Command(Command::Reset));
    }

    #[test]
    fn test_setngrok_argument() {
        assert_eq!(
            parse("/setngrok https://abc.ngrok.io/ extra"),
            Inbound::Command(Command::SetEndpoint(Some("https://abc.ngrok.io/".into())))
        );
        assert_eq!(parse("/setngrok"), Inbound::Command(Command::SetEndpoint(None)));
    }

    #[test]
    fn test_bot_suffix_and_case() {
        assert_eq!(parse("/status@advi_bot"), Inbound::Command(Command::Status));
        assert_eq!(parse("/RESET"), Inbound::Command(Command::Reset));
        assert_eq!(
            parse("/setngrok@advi_bot http://x.test"),
            Inbound::Command(Command::SetEndpoint(Some("http://x.test".into())))
        );
    }

    #[test]
    fn test_unknown_command_and_blank_ignored() {
        assert_eq!(parse("/weather today"), Inbound::Ignored);
        assert_eq!(parse("/"), Inbound::Ignored);
        assert_eq!(parse("   "), Inbound::Ignored);
    }
}
