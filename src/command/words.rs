//! Splitting an input line into words.
//!
//! Rules:
//!
//! - Words are separated by ASCII whitespace.
//! - Single or double quotes group text into one word; the quotes are
//!   removed. Quotes may appear mid-word (`a"b c"d` is the single word
//!   `ab cd`). An unterminated quote extends to the end of the line.
//! - Outside single quotes a backslash takes the next character literally.
//!   A trailing lone backslash is dropped.
//! - A `#` at the start of a word starts a comment that runs to the end of
//!   the line.
//!
//! An empty or comment-only line yields no words.

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Split `line` into words.
pub fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    // A word may be empty (`""`), so track whether one was started
    let mut in_word = false;
    let mut quote = Quote::None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match quote {
            Quote::Single => {
                if c == '\'' {
                    quote = Quote::None;
                } else {
                    current.push(c);
                }
            }
            Quote::Double => match c {
                '"' => quote = Quote::None,
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                _ => current.push(c),
            },
            Quote::None => match c {
                c if c.is_ascii_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                '#' if !in_word => break,
                '\'' => {
                    quote = Quote::Single;
                    in_word = true;
                }
                '"' => {
                    quote = Quote::Double;
                    in_word = true;
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                    in_word = true;
                }
                _ => {
                    current.push(c);
                    in_word = true;
                }
            },
        }
    }

    if in_word {
        words.push(current);
    }
    words
}
