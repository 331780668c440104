use unicode_width::UnicodeWidthStr;

/// Terminal column width of `s`; CJK characters take two columns.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Right-pad `s` with spaces to `width` terminal columns.
pub fn pad_to_width(s: &str, width: usize) -> String {
    let w = display_width(s);
    let mut out = String::with_capacity(s.len() + width.saturating_sub(w));
    out.push_str(s);
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(w)));
    out
}

/// Widest entry, in terminal columns.
pub fn max_width<'a, I>(items: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    items.into_iter().map(display_width).max().unwrap_or(0)
}
