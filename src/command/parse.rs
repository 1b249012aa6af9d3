use crate::error::{Result, VizError};

/// A hand-edited command line split back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub program: Option<String>,
    pub input: Option<String>,
    pub options: Vec<String>,
    pub output: Option<String>,
}

/// Split a command line into tokens.
///
/// Whitespace separates tokens; single and double quotes group, and a
/// backslash escapes the next character outside single quotes.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') | (Some('"'), '"') => quote = None,
            (Some('\''), _) => current.push(c),
            (_, '\\') => {
                let next = chars
                    .next()
                    .ok_or_else(|| VizError::InvalidCommand("trailing backslash".to_string()))?;
                current.push(next);
                in_token = true;
            }
            (Some(_), _) => current.push(c),
            (None, '"') | (None, '\'') => {
                quote = Some(c);
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, _) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(VizError::InvalidCommand(format!("unterminated {} quote", q)));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parse a full command line such as the synthesized display string.
///
/// The leading program token, the first `-i <input>` pair and the trailing
/// output file are taken out; everything else stays, in order, as options.
/// A full command (program and input present) always ends with its output
/// file. Fragments without them only yield an output when the last token
/// cannot be the value of a preceding flag.
pub fn parse_command_line(line: &str) -> Result<ParsedCommand> {
    let mut tokens = tokenize(line)?;
    if tokens.is_empty() {
        return Err(VizError::InvalidCommand("empty command".to_string()));
    }

    let program = if tokens[0].starts_with('-') {
        None
    } else {
        Some(tokens.remove(0))
    };

    let input = match tokens.iter().position(|t| t == "-i") {
        Some(idx) if idx + 1 < tokens.len() => {
            let input = tokens.remove(idx + 1);
            tokens.remove(idx);
            Some(input)
        }
        Some(_) => return Err(VizError::InvalidCommand("-i without a file".to_string())),
        None => None,
    };

    let full_command = program.is_some() && input.is_some();
    let output = match tokens.last() {
        Some(last) if last.starts_with('-') => None,
        Some(_) if full_command || !ends_with_value_flag(&tokens) => tokens.pop(),
        _ => None,
    };

    Ok(ParsedCommand {
        program,
        input,
        options: tokens,
        output,
    })
}

// `... -c:a copy` has no output file: the last token is the flag's value.
fn ends_with_value_flag(tokens: &[String]) -> bool {
    tokens.len() >= 2 && {
        let flag = &tokens[tokens.len() - 2];
        flag.starts_with('-') && !is_switch(flag)
    }
}

fn is_switch(flag: &str) -> bool {
    matches!(flag, "-an" | "-vn" | "-sn" | "-dn" | "-y" | "-n" | "-nostdin" | "-hide_banner")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(
            tokenize(r#"ffmpeg -i "my clip.mov" -vf 'scale=640:-1' out\ put.mp4"#).unwrap(),
            vec!["ffmpeg", "-i", "my clip.mov", "-vf", "scale=640:-1", "out put.mp4"]
        );
        assert_eq!(tokenize("  a   b ").unwrap(), vec!["a", "b"]);
        assert_eq!(tokenize(r#""""#).unwrap(), vec![""]);
        assert!(tokenize(r#"ffmpeg -i "open"#).is_err());
    }

    #[test]
    fn test_parse_synthesized_shape() {
        let parsed = parse_command_line(
            r#"ffmpeg -i "input.mp4" -ss 00:00:05.000 -t 00:00:10.000 -c:v copy -an "out.mp4""#,
        )
        .unwrap();

        assert_eq!(parsed.program.as_deref(), Some("ffmpeg"));
        assert_eq!(parsed.input.as_deref(), Some("input.mp4"));
        assert_eq!(parsed.output.as_deref(), Some("out.mp4"));
        assert_eq!(
            parsed.options,
            vec!["-ss", "00:00:05.000", "-t", "00:00:10.000", "-c:v", "copy", "-an"]
        );
    }

    #[test]
    fn test_parse_keeps_input_seeking_options() {
        let parsed = parse_command_line("ffmpeg -ss 3 -i in.mp4 -c copy out.mkv").unwrap();
        assert_eq!(parsed.options, vec!["-ss", "3", "-c", "copy"]);
        assert_eq!(parsed.output.as_deref(), Some("out.mkv"));
    }

    #[test]
    fn test_parse_fragment_without_output() {
        let parsed = parse_command_line("-c:v libx264 -c:a copy").unwrap();
        assert_eq!(parsed.output, None);
        assert_eq!(parsed.options, vec!["-c:v", "libx264", "-c:a", "copy"]);

        let parsed = parse_command_line("-an out.mp4").unwrap();
        assert_eq!(parsed.output.as_deref(), Some("out.mp4"));

        let parsed = parse_command_line("ffmpeg -i in.mp4 -an").unwrap();
        assert_eq!(parsed.output, None);
    }

    #[test]
    fn test_full_command_always_ends_with_output() {
        for switch in ["-shortest", "-copyts", "-bitexact", "-an"] {
            let line = format!(r#"ffmpeg -i "clip.mov" -c:v libx264 {} "short.mp4""#, switch);
            let parsed = parse_command_line(&line).unwrap();
            assert_eq!(parsed.output.as_deref(), Some("short.mp4"));
            assert_eq!(parsed.options, vec!["-c:v", "libx264", switch]);
        }
    }

    #[test]
    fn test_parse_rejects_dangling_input_flag() {
        assert!(parse_command_line("ffmpeg -i").is_err());
        assert!(parse_command_line("   ").is_err());
    }
}
