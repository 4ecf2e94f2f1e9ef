//! Per-segment decodability checks.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// Returns `true` if `segment` can be percent-decoded without error.
///
/// The check matches what a browser's `decodeURIComponent` accepts: every
/// `%` must introduce a two-hex-digit escape and the decoded bytes must
/// form valid UTF-8. The whole segment text is checked, not key and value
/// separately, so a bad escape anywhere fails the segment. The empty
/// segment trivially decodes to itself.
pub fn is_decodable(segment: &str) -> bool {
    decode_segment(segment).is_some()
}

/// Returns `true` only if every segment is decodable.
///
/// Short-circuits on the first undecodable segment.
pub fn all_decodable<'a>(segments: impl IntoIterator<Item = &'a str>) -> bool {
    segments.into_iter().all(is_decodable)
}

/// Decodes a single segment, or `None` if it is undecodable.
///
/// `percent_decode_str` passes malformed escapes through unchanged rather
/// than failing, so the escape shape is checked before decoding.
fn decode_segment(segment: &str) -> Option<Cow<'_, str>> {
    let bytes = segment.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' {
            match bytes.get(index + 1..index + 3) {
                Some(digits) if digits.iter().all(u8::is_ascii_hexdigit) => index += 3,
                _ => return None,
            }
        } else {
            index += 1;
        }
    }
    percent_decode_str(segment).decode_utf8().ok()
}
