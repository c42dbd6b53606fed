use std::borrow::Cow;

/// Lexical context of the byte being looked at.
#[derive(Clone)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Walk `sql`, offering every byte that sits in plain SQL (outside string literals, quoted
/// identifiers, comments and dollar-quoted bodies) to `replace`.
///
/// `replace` returns `Some((end, text))` to substitute `sql[idx..end]` with `text`. Only the
/// replaced spans are rewritten; everything else is copied verbatim, so multi-byte text passes
/// through untouched. Returns a borrowed `Cow` when nothing was replaced.
pub(super) fn rewrite<F, E>(sql: &str, mut replace: F) -> Result<Cow<'_, str>, E>
where
    F: FnMut(&[u8], usize) -> Result<Option<(usize, String)>, E>,
{
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => {
                if let Some((end, text)) = replace(bytes, idx)? {
                    let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 8));
                    buf.push_str(&sql[copied..idx]);
                    buf.push_str(&text);
                    copied = end;
                    idx = end;
                    continue;
                }
                match b {
                    b'\'' => state = State::SingleQuoted,
                    b'"' => state = State::DoubleQuoted,
                    b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                        state = State::LineComment;
                        idx += 1;
                    }
                    b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                        state = State::BlockComment(1);
                        idx += 1;
                    }
                    b'$' => {
                        if let Some((tag, close)) = dollar_quote_tag(bytes, idx) {
                            state = State::DollarQuoted(tag);
                            idx = close;
                        }
                    }
                    _ => {}
                }
            }
            State::SingleQuoted | State::DoubleQuoted => {
                let quote = if matches!(state, State::SingleQuoted) {
                    b'\''
                } else {
                    b'"'
                };
                if b == quote {
                    if bytes.get(idx + 1) == Some(&quote) {
                        idx += 1; // doubled quote stays inside the literal
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && closes_dollar_quote(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Ok(Cow::Owned(buf))
        }
        None => Ok(Cow::Borrowed(sql)),
    }
}

/// Digits starting at `start`, with the index one past the last digit.
pub(super) fn scan_digits(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let end = start + bytes[start.min(bytes.len())..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if end == start {
        None
    } else {
        std::str::from_utf8(&bytes[start..end])
            .ok()
            .map(|digits| (end, digits))
    }
}

/// Identifier (`[A-Za-z_][A-Za-z0-9_]*`) starting at `start`.
pub(super) fn scan_identifier(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let first = *bytes.get(start)?;
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return None;
    }
    let end = start
        + bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
            .count();
    std::str::from_utf8(&bytes[start..end])
        .ok()
        .map(|name| (end, name))
}

/// `$tag$` opener at `start`: returns the tag and the index of its closing `$`.
/// Tags never start with a digit, so `$1` stays a placeholder.
fn dollar_quote_tag(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    if bytes.get(start + 1).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        if !(bytes[idx].is_ascii_alphanumeric() || bytes[idx] == b'_') {
            return None;
        }
        idx += 1;
    }
    if idx < bytes.len() {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

fn closes_dollar_quote(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    end < bytes.len() && &bytes[idx + 1..end] == tag.as_bytes() && bytes[end] == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper_x(sql: &str) -> String {
        rewrite::<_, ()>(sql, |bytes, idx| {
            Ok((bytes[idx] == b'x').then(|| (idx + 1, "X".to_string())))
        })
        .unwrap()
        .into_owned()
    }

    #[test]
    fn leaves_literals_and_comments_alone() {
        assert_eq!(upper_x("x 'x' \"x\" -- x\nx"), "X 'x' \"x\" -- x\nX");
        assert_eq!(upper_x("x /* x /* x */ x */ x"), "X /* x /* x */ x */ X");
        assert_eq!(upper_x("x 'it''s x' x"), "X 'it''s x' X");
    }

    #[test]
    fn leaves_dollar_quoted_bodies_alone() {
        assert_eq!(upper_x("$fn$ x $fn$ x"), "$fn$ x $fn$ X");
        assert_eq!(upper_x("$$ x $$x"), "$$ x $$X");
    }

    #[test]
    fn multibyte_text_survives() {
        assert_eq!(upper_x("café x 'naïve'"), "café X 'naïve'");
    }

    #[test]
    fn borrowed_when_untouched() {
        let out = rewrite::<_, ()>("select 1", |_, _| Ok(None)).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn scanners() {
        assert_eq!(scan_digits(b"$12 ", 1), Some((3, "12")));
        assert_eq!(scan_digits(b"$a", 1), None);
        assert_eq!(scan_digits(b"?", 1), None);
        assert_eq!(scan_identifier(b":user_id,", 1), Some((8, "user_id")));
        assert_eq!(scan_identifier(b":1", 1), None);
    }
}
