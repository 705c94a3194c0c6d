// SPDX-License-Identifier: MIT OR Apache-2.0
//! Content-type classifier: decide whether a MIME type is JSON-shaped.

/// Returns `true` when `content_type` is JSON-shaped:
///
/// - blank or absent (`None` or whitespace-only) is JSON-shaped;
/// - after trimming whitespace and stripping any `;`-delimited parameters,
///   the type is JSON-shaped when it equals `application/json`
///   case-insensitively, or its subtype (the text after the single `/`)
///   equals `json` case-insensitively, or ends with `+json`
///   case-insensitively;
/// - a string with zero or multiple `/` characters, or one ending in `/`,
///   is not JSON-shaped (it fails to parse as a `type/subtype` pair at
///   all).
#[must_use]
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    let raw = match content_type {
        None => return true,
        Some(s) => s,
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return true;
    }
    let without_params = trimmed.split(';').next().unwrap_or("").trim();
    if without_params.eq_ignore_ascii_case("application/json") {
        return true;
    }
    let mut parts = without_params.splitn(2, '/');
    let _type = match parts.next() {
        Some(t) if !t.is_empty() => t,
        _ => return false,
    };
    let subtype = match parts.next() {
        Some(s) => s,
        None => return false, // zero '/' characters
    };
    if subtype.is_empty() {
        return false; // ends in '/'
    }
    if without_params.matches('/').count() != 1 {
        return false; // multiple '/' characters
    }
    subtype.eq_ignore_ascii_case("json") || subtype.to_ascii_lowercase().ends_with("+json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_absent_are_json() {
        assert!(is_json_content_type(None));
        assert!(is_json_content_type(Some("")));
        assert!(is_json_content_type(Some("   ")));
    }

    #[test]
    fn exact_application_json() {
        assert!(is_json_content_type(Some("application/json")));
        assert!(is_json_content_type(Some("APPLICATION/JSON")));
    }

    #[test]
    fn parameters_are_stripped() {
        assert!(is_json_content_type(Some(
            "application/json; charset=utf-8"
        )));
    }

    #[test]
    fn subtype_json_matches_any_prefix() {
        assert!(is_json_content_type(Some("text/json")));
        assert!(is_json_content_type(Some("foo/json")));
    }

    #[test]
    fn plus_json_suffix_matches() {
        assert!(is_json_content_type(Some("application/vnd.api+json")));
        assert!(is_json_content_type(Some("application/cloudevents+JSON")));
    }

    #[test]
    fn non_json_types_are_rejected() {
        assert!(!is_json_content_type(Some("text/plain")));
        assert!(!is_json_content_type(Some("application/xml")));
    }

    #[test]
    fn malformed_mime_strings_are_not_json() {
        assert!(!is_json_content_type(Some("application")));
        assert!(!is_json_content_type(Some("application/json/extra")));
        assert!(!is_json_content_type(Some("application/")));
    }
}
