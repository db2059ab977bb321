//! Path component escaping for content directories.

/// Linux NAME_MAX in bytes.
pub const NAME_MAX: usize = 255;

/// Maps an id (source id, content id) onto a single Linux path component.
///
/// - Percent-escapes `%`, NUL, `/`, `\`, whitespace and control characters
///   (one `%XX` per UTF-8 byte)
/// - Escapes a leading `.` so the result is never `.`, `..` or hidden
///
/// The mapping is reversible, so distinct ids never share a directory.
/// The empty string maps to `%`, which no escaped id can produce.
/// Length is not limited here; see [`component_fits`].
pub fn escape_component(name: &str) -> String {
    if name.is_empty() {
        return "%".to_string();
    }
    let mut out = String::with_capacity(name.len());
    for (i, c) in name.char_indices() {
        let reserved = c == '%'
            || c == '/'
            || c == '\\'
            || c == '\0'
            || c.is_control()
            || c.is_whitespace()
            || (i == 0 && c == '.');
        if reserved {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", b));
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// True when the escaped form of `name` is a valid component length.
pub fn component_fits(name: &str) -> bool {
    escape_component(name).len() <= NAME_MAX
}
