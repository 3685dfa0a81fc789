//! Slash commands understood by `colloquy-chat`.
//!
//! A line that starts with `/` steers the REPL (history, system prompt, assistant thread)
//! and is never forwarded to the provider.  Everything else is a message.

/// One REPL command.  Some only make sense for one backend; the binary rejects the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// `/clear`: drop the chat history, or forget the assistant thread.
    Clear,

    /// `/system [prompt]`: replace the system prompt, or print it when no prompt follows.
    System(Option<String>),

    /// `/history`: print every turn held by the chat client.
    History,

    /// `/thread`: print the assistant thread id, if one is known.
    Thread,

    /// `/reset`: forget the assistant thread so the next message opens a new one.
    Reset,

    /// `/help` or `/?`.
    Help,

    /// `/quit`, `/exit` or `/q`.
    Quit,

    /// An unrecognized `/word`, carrying the message to show.
    Invalid(String),
}

/// Split a REPL line into a command, or `None` when it is a message for the model.
///
/// Command names are case-insensitive; everything after the first space is the argument.
///
/// # Examples
///
/// ```
/// # use colloquy::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/system Be brief.").is_some());
/// assert!(parse_command("Hello!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "system" => ChatCommand::System(argument.map(|s| s.to_string())),
        "history" => ChatCommand::History,
        "thread" => ChatCommand::Thread,
        "reset" => ChatCommand::Reset,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// The `/help` listing.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear conversation history
  /system [prompt]       Set the system prompt (no argument shows it)
  /history               Print the conversation so far
  /thread                Show the assistant thread id
  /reset                 Start a fresh assistant thread
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_aliases_and_surrounding_whitespace() {
        for line in ["/quit", "/exit", "/q", "\t/QUIT \n"] {
            assert_eq!(parse_command(line), Some(ChatCommand::Quit), "{line:?}");
        }
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn system_argument_is_trimmed_or_absent() {
        assert_eq!(
            parse_command("/system   Reply in French.  "),
            Some(ChatCommand::System(Some("Reply in French.".to_string())))
        );
        assert_eq!(parse_command("/System"), Some(ChatCommand::System(None)));
        assert_eq!(parse_command("/system   "), Some(ChatCommand::System(None)));
    }

    #[test]
    fn history_and_thread_commands() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
        assert_eq!(parse_command("/thread"), Some(ChatCommand::Thread));
        assert_eq!(parse_command("/Reset now"), Some(ChatCommand::Reset));
    }

    #[test]
    fn unknown_command_names_the_command() {
        assert_eq!(
            parse_command("/model gpt-4"),
            Some(ChatCommand::Invalid("Unknown command: /model".to_string()))
        );
    }

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(parse_command("What does /reset do?"), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text();
        for name in ["/clear", "/system", "/history", "/thread", "/reset", "/help", "/quit"] {
            assert!(help.contains(name), "{name}");
        }
    }
}
