/// A rendered row that carries its visible index as an attribute.
///
/// Hosts implement this for whatever they render (DOM wrappers, widget handles, test doubles)
/// so measurement callbacks can map an element back to its index.
pub trait IndexedElement {
    fn attribute(&self, name: &str) -> Option<&str>;
}

/// Parses a leading base-10 integer the way lenient attribute readers do: surrounding
/// whitespace and an optional sign are accepted, trailing garbage is ignored.
///
/// Returns `None` when no digit follows the optional sign.
pub(crate) fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let mut value: i64 = 0;
    for b in digits[..end].bytes() {
        value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
    }
    Some(if negative { -value } else { value })
}
