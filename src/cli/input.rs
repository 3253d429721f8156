//! Line commands typed during a `run` session.

use crate::guidance::Command;

/// A parsed line of user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCommand {
    /// Forward to the engine.
    Engine(Command),
    /// End the session and exit.
    Quit,
    /// Print the command summary.
    Help,
}

/// Input that matched no command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand {
    /// What was typed, trimmed.
    pub input: String,
    /// Closest known command, when one is near enough.
    pub suggestion: Option<&'static str>,
}

impl std::fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown command '{}'", self.input)?;
        if let Some(suggestion) = self.suggestion {
            write!(f, "; did you mean '{suggestion}'?")?;
        }
        Ok(())
    }
}

const WORDS: [(&str, LineCommand); 16] = [
    ("p", LineCommand::Engine(Command::Pause)),
    ("pause", LineCommand::Engine(Command::Pause)),
    ("r", LineCommand::Engine(Command::Resume)),
    ("resume", LineCommand::Engine(Command::Resume)),
    ("n", LineCommand::Engine(Command::Skip)),
    ("next", LineCommand::Engine(Command::Skip)),
    ("skip", LineCommand::Engine(Command::Skip)),
    ("t", LineCommand::Engine(Command::Tap)),
    ("tap", LineCommand::Engine(Command::Tap)),
    ("start", LineCommand::Engine(Command::Start)),
    ("q", LineCommand::Quit),
    ("quit", LineCommand::Quit),
    ("stop", LineCommand::Quit),
    ("exit", LineCommand::Quit),
    ("h", LineCommand::Help),
    ("help", LineCommand::Help),
];

/// Summary printed for `help`.
pub const HELP: &str = "commands: [Enter]/t tap  p pause  r resume  n skip  q quit  h help";

/// Parses one line. An empty line is a tap.
///
/// # Errors
///
/// Returns [`UnknownCommand`] with a suggestion when the closest known
/// command is within a Damerau-Levenshtein distance of 2.
pub fn parse_line(line: &str) -> Result<LineCommand, UnknownCommand> {
    let word = line.trim().to_lowercase();
    if word.is_empty() {
        return Ok(LineCommand::Engine(Command::Tap));
    }
    if word == "?" {
        return Ok(LineCommand::Help);
    }
    WORDS
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, command)| *command)
        .ok_or_else(|| UnknownCommand {
            suggestion: suggest(&word),
            input: word,
        })
}

fn suggest(input: &str) -> Option<&'static str> {
    WORDS
        .iter()
        .filter(|(name, _)| name.len() > 1)
        .map(|(name, _)| (*name, strsim::damerau_levenshtein(input, name)))
        .filter(|(_, dist)| *dist <= 2)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_and_long_forms() {
        assert_eq!(parse_line("p"), Ok(LineCommand::Engine(Command::Pause)));
        assert_eq!(parse_line(" Resume \n"), Ok(LineCommand::Engine(Command::Resume)));
        assert_eq!(parse_line("skip"), Ok(LineCommand::Engine(Command::Skip)));
        assert_eq!(parse_line("n"), Ok(LineCommand::Engine(Command::Skip)));
        assert_eq!(parse_line("stop"), Ok(LineCommand::Quit));
        assert_eq!(parse_line("?"), Ok(LineCommand::Help));
    }

    #[test]
    fn test_empty_line_taps() {
        assert_eq!(parse_line(""), Ok(LineCommand::Engine(Command::Tap)));
        assert_eq!(parse_line("   "), Ok(LineCommand::Engine(Command::Tap)));
    }

    #[test]
    fn test_typo_gets_suggestion() {
        let err = parse_line("pasue").unwrap_err();
        assert_eq!(err.suggestion, Some("pause"));
        assert_eq!(
            err.to_string(),
            "unknown command 'pasue'; did you mean 'pause'?"
        );
    }

    #[test]
    fn test_unrelated_input_has_no_suggestion() {
        let err = parse_line("defibrillate").unwrap_err();
        assert_eq!(err.suggestion, None);
        assert_eq!(err.to_string(), "unknown command 'defibrillate'");
    }
}
