//! Parser for driver scripts.
//!
//! The top-level entry points are [`parse_str`] and [`parse_file`].

use crate::command::DriverCommand;
use crate::commands::{
    Advance, Click, DeclareControl, Expect, Load, SetDebounce, SetPunctuationPause,
    SetTypingSpeed, Show, TypeText, Wait,
};
use anyhow::{Context as _, Result, anyhow};
use std::path::Path;
use std::time::Duration;

/// Parse a driver script from a string slice and return the resulting commands.
///
/// Lines that are empty or start with `#` are ignored. Inline comments (` # …`)
/// are stripped while preserving `#` characters inside quoted strings, so
/// selectors like `"#submit"` survive.
///
/// # Errors
///
/// Returns an error if any line contains an unknown command, a malformed
/// argument, or an unclosed quoted string.
///
/// # Example
///
/// ```
/// use walkthrough::parse_str;
///
/// let commands = parse_str("load \"intro\"\nclick \"#next\" # go on\n").unwrap();
/// assert_eq!(commands.len(), 2);
/// ```
pub fn parse_str(content: &str) -> Result<Vec<Box<dyn DriverCommand>>> {
    let mut commands = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = strip_inline_comment(line);
        let cmd = parse_line(line)
            .with_context(|| format!("Failed to parse line {}: {}", line_num + 1, line))?;
        commands.push(cmd);
    }
    Ok(commands)
}

/// Parse a driver script from a file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Box<dyn DriverCommand>>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script file: {}", path.display()))?;
    parse_str(&content)
}

type ParseFn = fn(&str) -> Result<Box<dyn DriverCommand>>;

static REGISTRY: &[(&str, ParseFn)] = &[
    (DeclareControl::NAME, DeclareControl::parse_boxed),
    (Load::NAME, Load::parse_boxed),
    (Advance::NAME, Advance::parse_boxed),
    (Click::NAME, Click::parse_boxed),
    (TypeText::NAME, TypeText::parse_boxed),
    (Wait::NAME, Wait::parse_boxed),
    (Expect::NAME, Expect::parse_boxed),
    (Show::NAME, Show::parse_boxed),
    (SetTypingSpeed::NAME, SetTypingSpeed::parse_boxed),
    (SetPunctuationPause::NAME, SetPunctuationPause::parse_boxed),
    (SetDebounce::NAME, SetDebounce::parse_boxed),
];

/// Dispatch a single non-empty, non-comment line to the matching command's parser.
fn parse_line(line: &str) -> Result<Box<dyn DriverCommand>> {
    let (name, args) = line.split_once(' ').unwrap_or((line, ""));
    REGISTRY
        .iter()
        .find(|(cmd_name, _)| *cmd_name == name)
        .map(|(_, parse)| parse(args))
        .unwrap_or_else(|| Err(anyhow!("Unknown command: {}", line)))
}

/// Strip inline comments from a line, preserving `#` inside quoted strings.
fn strip_inline_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return line[..i].trim(),
            _ => {}
        }
    }
    line
}

/// Parse a duration string: `1s`, `500ms`, `1.5s`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if let Some(ms_str) = s.strip_suffix("ms") {
        let ms: u64 = ms_str
            .trim()
            .parse()
            .context("Invalid milliseconds value")?;
        Ok(Duration::from_millis(ms))
    } else if let Some(s_str) = s.strip_suffix('s') {
        let secs: f64 = s_str.trim().parse().context("Invalid seconds value")?;
        Duration::try_from_secs_f64(secs).context("Invalid seconds value")
    } else {
        Err(anyhow!("Duration must end with 's' or 'ms', got: {}", s))
    }
}

/// Parse a double-quoted string, processing `\n`, `\t`, `\"`, and `\\`.
pub(crate) fn parse_quoted_string(s: &str) -> Result<String> {
    let (value, rest) = take_quoted(s)?;
    if !rest.is_empty() {
        return Err(anyhow!("Unexpected text after closing quote: {}", rest));
    }
    Ok(value)
}

/// Split a leading double-quoted string off `s`, returning its unescaped
/// value and the trimmed remainder.
pub(crate) fn take_quoted(s: &str) -> Result<(String, &str)> {
    let s = s.trim();
    let body = s
        .strip_prefix('"')
        .ok_or_else(|| anyhow!("Expected string to start with '\"'"))?;

    let mut value = String::new();
    let mut chars = body.char_indices();
    while let Some((i, ch)) = chars.next() {
        match ch {
            '"' => return Ok((value, body[i + 1..].trim())),
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, other)) => value.push(other),
                None => break,
            },
            _ => value.push(ch),
        }
    }
    Err(anyhow!("Expected string to end with '\"'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(
            parse_duration("1.5s").unwrap(),
            Duration::from_secs_f64(1.5)
        );
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("10").is_err());
    }

    #[test]
    fn test_parse_quoted_string() {
        assert_eq!(parse_quoted_string("\"hello\"").unwrap(), "hello");
        assert_eq!(
            parse_quoted_string("\"hello\\nworld\"").unwrap(),
            "hello\nworld"
        );
        assert_eq!(parse_quoted_string(r#""a \"b\" \\ c""#).unwrap(), r#"a "b" \ c"#);
        assert!(parse_quoted_string(r#""a" b"#).is_err());
    }

    #[test]
    fn test_take_quoted() {
        let (value, rest) = take_quoted(r##" "#sel" "text" "##).unwrap();
        assert_eq!(value, "#sel");
        assert_eq!(rest, r#""text""#);

        let (value, rest) = take_quoted(r#""héllo" 2s"#).unwrap();
        assert_eq!(value, "héllo");
        assert_eq!(rest, "2s");

        assert!(take_quoted(r#""unclosed"#).is_err());
        assert!(take_quoted(r#""trailing\"#).is_err());
        assert!(take_quoted("bare").is_err());
    }

    #[test]
    fn test_parse_all_commands() {
        let script = r##"
control "#go"
control "#secret" hidden
load "intro"
advance
click "#go"
type "#name" "Ada"
wait 500ms
expect "Hello" 2s
show "note"
speed 30ms
punctuation 200ms
debounce 100ms
"##;
        let cmds = parse_str(script).unwrap();
        let names: Vec<_> = cmds.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            [
                "control",
                "control",
                "load",
                "advance",
                "click",
                "type",
                "wait",
                "expect",
                "show",
                "speed",
                "punctuation",
                "debounce"
            ]
        );
    }

    #[test]
    fn test_parse_comments_and_blank_lines() {
        assert_eq!(parse_str("# c1\n\n# c2\n").unwrap().len(), 0);
        let cmds = parse_str("\nadvance # next\n\nwait 1s\n").unwrap();
        assert_eq!(cmds.len(), 2);
    }

    #[test]
    fn test_parse_invalid_command() {
        let err = format!("{:#}", parse_str("advance\nfrobnicate \"x\"").err().unwrap());
        assert!(err.contains("line 2"), "got: {err}");
        assert!(err.contains("Unknown command"), "got: {err}");
    }

    #[test]
    fn test_strip_inline_comments() {
        assert_eq!(strip_inline_comment("wait 1s # comment"), "wait 1s");
        assert_eq!(strip_inline_comment(r##"click "#go""##), r##"click "#go""##);
        assert_eq!(
            strip_inline_comment(r##"click "#go" # the button"##),
            r##"click "#go""##
        );
        assert_eq!(
            strip_inline_comment(r##"expect "say \"#1\"" # c"##),
            r##"expect "say \"#1\"""##
        );
    }
}
