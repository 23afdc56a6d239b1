//! Form submission decoding.
//!
//! [`decode_request_body`] turns a POST body plus its `Content-Type` header
//! into a [`FormBody`]. Only `multipart/form-data` with a `boundary`
//! parameter is decodable; everything else is reported as
//! [`FormBody::Undecodable`] and left to the proxy's policy.

pub mod decoder;

use indexmap::IndexMap;

pub use decoder::decode;

/// Result of decoding a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormBody {
    /// Fields that parsed cleanly, in body order. May be empty.
    Fields(IndexMap<String, String>),
    /// The body cannot be inspected; the string says why.
    Undecodable(String),
}

/// Extract the boundary token from a `multipart/form-data` content type.
///
/// Returns `None` for other media types or a missing/empty boundary.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let mut parts = content_type.split(';');
    let media_type = parts.next()?.trim();
    if !media_type.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    parts
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|b| !b.is_empty())
}

/// Decode a POST body according to its content type.
pub fn decode_request_body(content_type: Option<&str>, body: &[u8]) -> FormBody {
    let Some(content_type) = content_type else {
        return FormBody::Undecodable("request has no Content-Type".to_string());
    };
    match boundary_from_content_type(content_type) {
        Some(boundary) => FormBody::Fields(decode(body, &format!("--{}", boundary))),
        None => FormBody::Undecodable(format!(
            "content type '{}' is not multipart/form-data with a boundary",
            content_type
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_is_extracted() {
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary=xyz").as_deref(),
            Some("xyz")
        );
    }

    #[test]
    fn boundary_extraction_is_lenient_about_case_quotes_and_order() {
        assert_eq!(
            boundary_from_content_type("Multipart/Form-Data; charset=utf-8; BOUNDARY=\"abc\"")
                .as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn browser_style_boundary_is_kept_verbatim() {
        let ct = "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW";
        assert_eq!(
            boundary_from_content_type(ct).as_deref(),
            Some("----WebKitFormBoundary7MA4YWxkTrZu0gW")
        );
    }

    #[test]
    fn missing_or_empty_boundary_is_none() {
        assert!(boundary_from_content_type("multipart/form-data").is_none());
        assert!(boundary_from_content_type("multipart/form-data; boundary=").is_none());
    }

    #[test]
    fn other_media_types_are_none() {
        assert!(
            boundary_from_content_type("application/x-www-form-urlencoded; boundary=x").is_none()
        );
        assert!(boundary_from_content_type("application/json").is_none());
    }

    #[test]
    fn multipart_body_decodes_to_fields() {
        let body = b"--xyz\r\nContent-Disposition: form-data; name=\"comment\"\r\n\r\nconfidential data\r\n--xyz--\r\n";
        let decoded = decode_request_body(Some("multipart/form-data; boundary=xyz"), body);
        let FormBody::Fields(fields) = decoded else {
            panic!("expected fields");
        };
        assert_eq!(fields["comment"], "confidential data");
    }

    #[test]
    fn empty_multipart_body_has_no_fields() {
        let decoded = decode_request_body(Some("multipart/form-data; boundary=xyz"), b"");
        assert_eq!(decoded, FormBody::Fields(IndexMap::new()));
    }

    #[test]
    fn non_multipart_body_is_undecodable() {
        let decoded =
            decode_request_body(Some("application/x-www-form-urlencoded"), b"comment=secret");
        assert!(matches!(decoded, FormBody::Undecodable(_)));
        assert!(matches!(
            decode_request_body(None, b"anything"),
            FormBody::Undecodable(_)
        ));
        assert!(matches!(
            decode_request_body(Some("multipart/form-data"), b"anything"),
            FormBody::Undecodable(_)
        ));
    }
}
