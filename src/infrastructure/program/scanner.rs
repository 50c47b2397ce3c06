//! Delimiter-level syntax checking
//!
//! Not a parser. It tracks brackets, string, template and comment state well
//! enough to catch the errors that make a module unemittable: unbalanced or
//! unclosed delimiters and unterminated literals. Regex literals are not
//! recognized.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    /// 1-based
    pub line: usize,
    /// 1-based
    pub column: usize,
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Open { ch: char, line: usize, column: usize },
    Template { line: usize, column: usize },
    /// `${` inside a template; closed by `}`
    Substitution { line: usize, column: usize },
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(code: &'a str) -> Self {
        Self {
            chars: code.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn next(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }
}

fn error(message: impl Into<String>, line: usize, column: usize) -> SyntaxError {
    SyntaxError {
        message: message.into(),
        line,
        column,
    }
}

fn closer(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// First syntax error in `code`, if any
pub fn check_syntax(code: &str) -> Option<SyntaxError> {
    let mut cur = Cursor::new(code);
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        let (line, column) = (cur.line, cur.column);

        if let Some(Frame::Template { .. }) = stack.last() {
            match cur.next() {
                None => break,
                Some('\\') => {
                    cur.next();
                }
                Some('`') => {
                    stack.pop();
                }
                Some('$') if cur.peek() == Some('{') => {
                    cur.next();
                    stack.push(Frame::Substitution { line, column });
                }
                Some(_) => {}
            }
            continue;
        }

        let Some(ch) = cur.next() else { break };
        match ch {
            '/' if cur.peek() == Some('/') => {
                while let Some(c) = cur.next() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if cur.peek() == Some('*') => {
                cur.next();
                let mut closed = false;
                while let Some(c) = cur.next() {
                    if c == '*' && cur.peek() == Some('/') {
                        cur.next();
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Some(error("unterminated block comment", line, column));
                }
            }
            '\'' | '"' => loop {
                match cur.next() {
                    Some('\\') => {
                        cur.next();
                    }
                    Some(c) if c == ch => break,
                    Some('\n') | None => {
                        return Some(error("unterminated string literal", line, column));
                    }
                    Some(_) => {}
                }
            },
            '`' => stack.push(Frame::Template { line, column }),
            '(' | '[' | '{' => stack.push(Frame::Open { ch, line, column }),
            ')' | ']' | '}' => match stack.pop() {
                Some(Frame::Open { ch: open, .. }) if closer(open) == ch => {}
                Some(Frame::Substitution { .. }) if ch == '}' => {}
                Some(Frame::Open {
                    ch: open,
                    line: open_line,
                    column: open_column,
                }) => {
                    return Some(error(
                        format!(
                            "'{}' expected to close '{}' opened at {}:{}, found '{}'",
                            closer(open),
                            open,
                            open_line,
                            open_column,
                            ch
                        ),
                        line,
                        column,
                    ));
                }
                _ => return Some(error(format!("unexpected '{}'", ch), line, column)),
            },
            _ => {}
        }
    }

    stack.pop().map(|frame| match frame {
        Frame::Template { line, column } => error("unterminated template literal", line, column),
        Frame::Substitution { line, column } => {
            error("unterminated template substitution", line, column)
        }
        Frame::Open { ch, line, column } => {
            error(format!("'{}' is never closed", ch), line, column)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_module() {
        let code = r#"
import { h } from '@kiln/core';
// a comment with ( unbalanced
/* and { here */
export class A {
  render() {
    const s = "quote } inside";
    const t = `tpl ${this.items.map(i => `${i}`).join(',')} done`;
    return h('div', null, [s, t]);
  }
}
"#;
        assert_eq!(check_syntax(code), None);
    }

    #[test]
    fn test_unclosed_brace_reports_opening_position() {
        let err = check_syntax("class A {\n  m() {\n}\n").unwrap();
        assert_eq!(err.message, "'{' is never closed");
        assert_eq!((err.line, err.column), (1, 9));
    }

    #[test]
    fn test_mismatched_closer() {
        let err = check_syntax("call(a, [b)\n").unwrap();
        assert!(err.message.starts_with("']' expected to close '['"));
        assert_eq!((err.line, err.column), (1, 11));
    }

    #[test]
    fn test_stray_closer() {
        let err = check_syntax("a();\n}\n").unwrap();
        assert_eq!(err.message, "unexpected '}'");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unterminated_literals() {
        assert_eq!(
            check_syntax("const a = 'oops;\n").unwrap().message,
            "unterminated string literal"
        );
        assert_eq!(
            check_syntax("const a = `oops;\n").unwrap().message,
            "unterminated template literal"
        );
        assert_eq!(
            check_syntax("/* never ends").unwrap().message,
            "unterminated block comment"
        );
    }

    #[test]
    fn test_escaped_quotes() {
        assert_eq!(check_syntax(r#"const a = 'it\'s'; const b = "\"";"#), None);
    }
}
