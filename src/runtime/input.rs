use std::path::PathBuf;

use crate::context::Context;

/// One line of REPL input, interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Plain text becomes a text item
    AddText(String),
    /// `/file PATH`
    AddFile(PathBuf),
    /// `/delete N`, already converted to a zero-based index
    Delete(usize),
    /// `/send` or an empty line
    Send,
    List,
    Cancel,
    New,
    Help,
    Quit,
    /// Anything that looked like a command but wasn't one
    Invalid(String),
}

/// Interpret one line typed at the prompt
pub fn parse_line(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplCommand::Send;
    }

    let Some(rest) = trimmed.strip_prefix('/') else {
        return ReplCommand::AddText(trimmed.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "file" | "f" => {
            if arg.is_empty() {
                ReplCommand::Invalid("Usage: /file <path>".to_string())
            } else {
                ReplCommand::AddFile(PathBuf::from(arg))
            }
        }
        "delete" | "d" => match arg.parse::<usize>() {
            Ok(n) if n >= 1 => ReplCommand::Delete(n - 1),
            _ => ReplCommand::Invalid("Usage: /delete <number>".to_string()),
        },
        "send" | "s" => ReplCommand::Send,
        "list" | "l" => ReplCommand::List,
        "cancel" | "c" => ReplCommand::Cancel,
        "new" | "n" => ReplCommand::New,
        "help" | "h" | "?" => ReplCommand::Help,
        "quit" | "q" | "exit" => ReplCommand::Quit,
        other => ReplCommand::Invalid(format!("Unknown command: /{}", other)),
    }
}

/// Numbered, one-based item labels for display
pub fn render_items(context: &Context) -> Vec<String> {
    context
        .items()
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item.label()))
        .collect()
}

pub const HELP_TEXT: &str = "\
Type a line to add it to the context as a text item.

Commands:
  /file <path>     Add a file to the context
  /delete <n>      Remove item n from the context
  /list            Show the context items
  /send            Send the context to the model (or press Enter on an empty line)
  /cancel          Stop the reply being streamed
  /new             Start a fresh session
  /help            Show this help
  /quit            Exit

Ctrl-C while a reply is streaming cancels it; at the prompt it exits.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TextItem;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_text_and_empty_line() {
        assert_eq!(parse_line("  hello there \n"), ReplCommand::AddText("hello there".to_string()));
        assert_eq!(parse_line("   "), ReplCommand::Send);
        assert_eq!(parse_line("/send"), ReplCommand::Send);
    }

    #[test]
    fn test_file_command_keeps_spaces_in_path() {
        assert_eq!(
            parse_line("/file  notes/my file.txt "),
            ReplCommand::AddFile(PathBuf::from("notes/my file.txt"))
        );
        assert!(matches!(parse_line("/file"), ReplCommand::Invalid(_)));
    }

    #[test]
    fn test_delete_is_one_based() {
        assert_eq!(parse_line("/delete 1"), ReplCommand::Delete(0));
        assert_eq!(parse_line("/d 3"), ReplCommand::Delete(2));
        assert!(matches!(parse_line("/delete 0"), ReplCommand::Invalid(_)));
        assert!(matches!(parse_line("/delete x"), ReplCommand::Invalid(_)));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_line("/list"), ReplCommand::List);
        assert_eq!(parse_line("/cancel"), ReplCommand::Cancel);
        assert_eq!(parse_line("/new"), ReplCommand::New);
        assert_eq!(parse_line("/help"), ReplCommand::Help);
        assert_eq!(parse_line("/quit"), ReplCommand::Quit);
        assert_eq!(
            parse_line("/bogus"),
            ReplCommand::Invalid("Unknown command: /bogus".to_string())
        );
    }

    #[test]
    fn test_help_describes_ctrl_c() {
        assert!(HELP_TEXT.contains("Ctrl-C while a reply is streaming cancels it"));
        assert!(HELP_TEXT.contains("at the prompt it exits"));
    }

    #[test]
    fn test_render_items() {
        let mut context = Context::new();
        context.add_item(TextItem::new("first"));
        context.add_item(TextItem::new("second"));

        assert_eq!(
            render_items(&context),
            vec!["1. 📝 first".to_string(), "2. 📝 second".to_string()]
        );
    }
}
