//! # Tasks
//!
//! A task arrives as a shell-style command line and is turned into a
//! [`CommandSpec`] (program + argument list) before anything runs.
//!
//! Splitting follows POSIX word rules and nothing else:
//! - space, tab and newline separate words; other blanks are ordinary characters
//! - `'...'` keeps everything literally
//! - `"..."` keeps everything except `\"`, `\\`, `\$`, `` \` `` and `\<newline>`
//! - outside quotes `\x` is a literal `x`, `\<newline>` disappears
//!
//! There is no expansion of any kind: `$HOME`, `*.csv`, `|` and `>` are
//! passed through as ordinary characters.

use serde::Serialize;
use std::fmt;

/// Why a command line could not be turned into words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing but whitespace
    Empty,
    /// A quote opened with this character never closes
    UnterminatedQuote(char),
    /// The line ends in a lone backslash
    TrailingEscape,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "task must not be empty"),
            ParseError::UnterminatedQuote(q) => write!(f, "unterminated {} quote", q),
            ParseError::TrailingEscape => write!(f, "trailing backslash"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Split a command line into words.
pub fn split_words(line: &str) -> Result<Vec<String>, ParseError> {
    let mut words = Vec::new();
    let mut word = String::new();
    // A word exists once any character or quote pair was seen; `''` is a word.
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' | '\n' => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '\\' => match chars.next() {
                Some('\n') => {}
                Some(next) => {
                    word.push(next);
                    in_word = true;
                }
                None => return Err(ParseError::TrailingEscape),
            },
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => word.push(ch),
                        None => return Err(ParseError::UnterminatedQuote('\'')),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(ch @ ('"' | '\\' | '$' | '`')) => word.push(ch),
                            Some('\n') => {}
                            Some(ch) => {
                                word.push('\\');
                                word.push(ch);
                            }
                            None => return Err(ParseError::UnterminatedQuote('"')),
                        },
                        Some(ch) => word.push(ch),
                        None => return Err(ParseError::UnterminatedQuote('"')),
                    }
                }
            }
            other => {
                word.push(other);
                in_word = true;
            }
        }
    }

    if in_word {
        words.push(word);
    }
    Ok(words)
}

/// Quote a single word so that [`split_words`] gives it back unchanged
pub fn quote_word(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// A structured command: the program and its arguments, already split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Parse a shell-style command line
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut words = split_words(line)?.into_iter();
        let program = words.next().ok_or(ParseError::Empty)?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote_word(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote_word(arg))?;
        }
        Ok(())
    }
}

/// A task as submitted, together with the command it parsed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    line: String,
    command: CommandSpec,
}

impl Task {
    /// Validate and parse a command line. The line is kept verbatim.
    ///
    /// A line that trims to nothing is empty, even if the blanks in it
    /// would not separate words.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        if line.trim().is_empty() {
            return Err(ParseError::Empty);
        }
        Ok(Self {
            line: line.to_string(),
            command: CommandSpec::parse(line)?,
        })
    }

    /// Wrap an already structured command; no parsing involved
    pub fn from_command(command: CommandSpec) -> Self {
        Self {
            line: command.to_string(),
            command,
        }
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &str) -> Vec<String> {
        split_words(line).unwrap()
    }

    #[test]
    fn test_plain_words() {
        assert_eq!(words("echo hello   world"), vec!["echo", "hello", "world"]);
        assert_eq!(words("  ls\t-la \n"), vec!["ls", "-la"]);
    }

    #[test]
    fn test_only_posix_blanks_separate() {
        assert_eq!(words("echo a\u{00A0}b"), vec!["echo", "a\u{00A0}b"]);
        assert_eq!(words("echo a\u{2003}b\tc"), vec!["echo", "a\u{2003}b", "c"]);
        assert_eq!(words("echo a\rb"), vec!["echo", "a\rb"]);

        assert_eq!(Task::parse("\u{00A0}"), Err(ParseError::Empty));
    }

    #[test]
    fn test_quotes() {
        assert_eq!(words("echo 'a b' \"c d\""), vec!["echo", "a b", "c d"]);
        assert_eq!(words("echo it\\'s"), vec!["echo", "it's"]);
        assert_eq!(words("echo ab'cd'\"ef\""), vec!["echo", "abcdef"]);
        assert_eq!(words("printf '' x"), vec!["printf", "", "x"]);
    }

    #[test]
    fn test_escapes() {
        assert_eq!(words(r"echo a\ b"), vec!["echo", "a b"]);
        assert_eq!(words(r#"echo "say \"hi\" \n""#), vec!["echo", r#"say "hi" \n"#]);
        assert_eq!(words(r#"echo "\$HOME""#), vec!["echo", "$HOME"]);
        assert_eq!(words("echo one\\\ntwo"), vec!["echo", "onetwo"]);
    }

    #[test]
    fn test_no_shell_semantics() {
        assert_eq!(
            words("cat *.csv | wc -l > out.txt $HOME"),
            vec!["cat", "*.csv", "|", "wc", "-l", ">", "out.txt", "$HOME"]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(split_words("echo 'oops"), Err(ParseError::UnterminatedQuote('\'')));
        assert_eq!(split_words("echo \"oops"), Err(ParseError::UnterminatedQuote('"')));
        assert_eq!(split_words("echo oops\\"), Err(ParseError::TrailingEscape));
    }

    #[test]
    fn test_task_rejects_blank() {
        assert_eq!(Task::parse(""), Err(ParseError::Empty));
        assert_eq!(Task::parse("   \t"), Err(ParseError::Empty));
        // quotes alone produce an empty program name, which is still a word
        let task = Task::parse("''").unwrap();
        assert_eq!(task.command().program, "");
    }

    #[test]
    fn test_task_keeps_line_verbatim() {
        let task = Task::parse(" echo  'x y' ").unwrap();
        assert_eq!(task.line(), " echo  'x y' ");
        assert_eq!(task.command(), &CommandSpec::new("echo").arg("x y"));
    }

    #[test]
    fn test_command_display_round_trips() {
        let cmd = CommandSpec::new("grep").args(["-e", "it's here", "a b.txt", ""]);
        let line = cmd.to_string();
        assert_eq!(line, r"grep -e 'it'\''s here' 'a b.txt' ''");
        assert_eq!(CommandSpec::parse(&line).unwrap(), cmd);

        let task = Task::from_command(CommandSpec::new("echo").arg("hello"));
        assert_eq!(task.line(), "echo hello");
    }
}
