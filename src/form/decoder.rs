//! Minimal `multipart/form-data` decoder.
//!
//! Only the simplest part shape is understood: a `Content-Disposition` header,
//! a blank line and a single-line value. Each block between two delimiters is
//! walked by a small state machine over its line segments:
//!
//! ```text
//! ExpectPreamble --blank--> ExpectHeader --disposition--> ExpectSeparator
//!   --blank--> ExpectValue --any--> ExpectTrailer --blank--> Done
//! ```
//!
//! Anything else (extra headers, multi-line values, a segment after `Done`)
//! drops the block. Decoding never fails; malformed parts are skipped.

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectPreamble,
    ExpectHeader,
    ExpectSeparator,
    ExpectValue,
    ExpectTrailer,
    Done,
}

/// Decode `raw_body` into field name → value.
///
/// `delimiter` is the boundary with its `--` prefix. A field name seen twice
/// keeps its first position and takes the last value.
pub fn decode(raw_body: &[u8], delimiter: &str) -> IndexMap<String, String> {
    let mut fields = IndexMap::new();
    if delimiter.is_empty() {
        return fields;
    }
    let body = String::from_utf8_lossy(raw_body);
    for block in body.split(delimiter) {
        if let Some((name, value)) = parse_block(block) {
            fields.insert(name, value);
        }
    }
    fields
}

fn parse_block(block: &str) -> Option<(String, String)> {
    let mut state = State::ExpectPreamble;
    let mut name = None;
    let mut value = None;

    for segment in segments(block) {
        state = match state {
            State::ExpectPreamble if is_blank(segment) => State::ExpectHeader,
            State::ExpectHeader => {
                name = Some(field_name(segment)?);
                State::ExpectSeparator
            }
            State::ExpectSeparator if is_blank(segment) => State::ExpectValue,
            State::ExpectValue => {
                // Lossy for values with meaningful outer whitespace.
                value = Some(segment.trim().to_string());
                State::ExpectTrailer
            }
            State::ExpectTrailer if is_blank(segment) => State::Done,
            _ => return None,
        };
    }

    match state {
        State::Done => Some((name?, value?)),
        _ => None,
    }
}

/// Line segments of a block: split on CR with one leading LF removed, so a
/// CRLF pair is a single break. A bare LF stays inside its segment.
fn segments(block: &str) -> impl Iterator<Item = &str> {
    block
        .split('\r')
        .map(|line| line.strip_prefix('\n').unwrap_or(line))
}

fn is_blank(segment: &str) -> bool {
    segment.trim().is_empty()
}

/// Extract the first quoted string of a `Content-Disposition` line.
fn field_name(header: &str) -> Option<String> {
    let (key, rest) = header.split_once(':')?;
    if !key.trim().eq_ignore_ascii_case("content-disposition") {
        return None;
    }
    let mut quoted = rest.split('"');
    quoted.next()?;
    let name = quoted.next()?;
    // Require the closing quote.
    quoted.next()?;
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(name: &str, value: &str) -> String {
        format!(
            "--xyz\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            name, value
        )
    }

    fn body(parts: &[String]) -> Vec<u8> {
        let mut out = parts.concat();
        out.push_str("--xyz--\r\n");
        out.into_bytes()
    }

    #[test]
    fn decodes_single_field() {
        let raw = body(&[part("comment", "confidential data")]);
        let fields = decode(&raw, "--xyz");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["comment"], "confidential data");
    }

    #[test]
    fn decodes_fields_in_body_order() {
        let raw = body(&[part("b", "2"), part("a", "1"), part("c", "3")]);
        let fields = decode(&raw, "--xyz");
        let names: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn duplicate_name_takes_last_value_at_first_position() {
        let raw = body(&[part("a", "first"), part("b", "x"), part("a", "second")]);
        let fields = decode(&raw, "--xyz");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get_index(0).unwrap(), (&"a".to_string(), &"second".to_string()));
        assert_eq!(fields["b"], "x");
    }

    #[test]
    fn value_with_line_break_is_dropped() {
        let raw = body(&[part("note", "line one\r\nline two"), part("name", "Bob")]);
        let fields = decode(&raw, "--xyz");
        assert!(!fields.contains_key("note"));
        assert_eq!(fields["name"], "Bob");
    }

    #[test]
    fn part_with_extra_header_is_dropped() {
        let file_part = "--xyz\r\nContent-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\nContent-Type: text/plain\r\n\r\nhello\r\n".to_string();
        let raw = body(&[file_part, part("name", "Bob")]);
        let fields = decode(&raw, "--xyz");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["name"], "Bob");
    }

    #[test]
    fn value_is_trimmed() {
        let raw = body(&[part("comment", "   padded  ")]);
        assert_eq!(decode(&raw, "--xyz")["comment"], "padded");
    }

    #[test]
    fn name_is_trimmed_and_must_be_non_empty() {
        let raw = body(&[part("  spaced ", "v"), part("  ", "lost")]);
        let fields = decode(&raw, "--xyz");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["spaced"], "v");
    }

    #[test]
    fn unquoted_or_unterminated_name_is_dropped() {
        let unquoted = "--xyz\r\nContent-Disposition: form-data; name=plain\r\n\r\nv\r\n".to_string();
        let open = "--xyz\r\nContent-Disposition: form-data; name=\"open\r\n\r\nv\r\n".to_string();
        assert!(decode(&body(&[unquoted, open]), "--xyz").is_empty());
    }

    #[test]
    fn other_header_instead_of_disposition_is_dropped() {
        let raw = "--xyz\r\nX-Other: \"name\"\r\n\r\nv\r\n--xyz--\r\n";
        assert!(decode(raw.as_bytes(), "--xyz").is_empty());
    }

    #[test]
    fn empty_value_is_kept() {
        let raw = body(&[part("empty", "")]);
        assert_eq!(decode(&raw, "--xyz")["empty"], "");
    }

    #[test]
    fn bare_lf_inside_value_is_kept_and_inspected() {
        let raw = body(&[part("a", "confidential\nleak")]);
        let fields = decode(&raw, "--xyz");
        assert_eq!(fields["a"], "confidential\nleak");
    }

    #[test]
    fn bare_cr_inside_value_drops_the_field() {
        let raw = body(&[part("a", "confidential\rleak"), part("b", "ok")]);
        let fields = decode(&raw, "--xyz");
        assert!(!fields.contains_key("a"));
        assert_eq!(fields["b"], "ok");
    }

    #[test]
    fn lf_only_line_endings_are_not_a_part() {
        let raw = "--xyz\nContent-Disposition: form-data; name=\"a\"\n\nvalue\n--xyz--\n";
        assert!(decode(raw.as_bytes(), "--xyz").is_empty());
    }

    #[test]
    fn empty_or_garbage_body_yields_no_fields() {
        assert!(decode(b"", "--xyz").is_empty());
        assert!(decode(b"not multipart at all", "--xyz").is_empty());
        assert!(decode(&body(&[part("a", "b")]), "").is_empty());
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let mut raw = b"--xyz\r\nContent-Disposition: form-data; name=\"bin\"\r\n\r\nab".to_vec();
        raw.push(0xFF);
        raw.extend_from_slice(b"cd\r\n--xyz--\r\n");
        assert_eq!(decode(&raw, "--xyz")["bin"], "ab\u{FFFD}cd");
    }

    #[test]
    fn every_decoded_name_is_non_empty() {
        let raw = body(&[part("a", "1"), part("", "2"), part("b", "3")]);
        let fields = decode(&raw, "--xyz");
        assert!(fields.keys().all(|k| !k.is_empty()));
    }
}
