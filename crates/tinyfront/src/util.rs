use std::fmt;

pub fn display_fn(f: impl Fn(&mut fmt::Formatter<'_>) -> fmt::Result) -> impl fmt::Display {
    DisplayFn(f)
}

struct DisplayFn<F>(F);
impl<F> fmt::Display for DisplayFn<F>
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.0)(formatter)
    }
}

/// Render a byte the way it would be written inside a pattern.
pub fn escape_byte(b: u8) -> impl fmt::Display {
    display_fn(move |f| match b {
        b'\n' => f.write_str("\\n"),
        b'\r' => f.write_str("\\r"),
        b'\t' => f.write_str("\\t"),
        0x0b => f.write_str("\\v"),
        0x0c => f.write_str("\\f"),
        b' ' => f.write_str("' '"),
        0x21..=0x7e => write!(f, "{}", b as char),
        _ => write!(f, "\\x{:02x}", b),
    })
}

/// Check that a symbol name is usable as a lexical class or grammar symbol.
pub fn verify_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        // The identifier must not be empty.
        return false;
    };
    if first != '_' && !unicode_ident::is_xid_start(first) {
        return false;
    }
    chars.all(unicode_ident::is_xid_continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(verify_ident("NUM"));
        assert!(verify_ident("_x1"));
        assert!(verify_ident("式"));
        assert!(!verify_ident(""));
        assert!(!verify_ident("1a"));
        assert!(!verify_ident("a-b"));
    }

    #[test]
    fn escaped_bytes() {
        assert_eq!(escape_byte(b'a').to_string(), "a");
        assert_eq!(escape_byte(b'\n').to_string(), "\\n");
        assert_eq!(escape_byte(0).to_string(), "\\x00");
    }
}
