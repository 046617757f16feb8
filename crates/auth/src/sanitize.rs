//! Service URL normalization.
//!
//! Some Java CAS clients append `;jsessionid=…` to their callback URL on one
//! request and not on the next. Service comparison is done on the normalized
//! form so the segment's presence or absence does not matter.

use std::sync::LazyLock;

use regex::Regex;

/// `;jsessionid=` run up to and including the first following `?`.
static JSESSIONID_BEFORE_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r";jsessionid=.*?\?").expect("JSESSIONID_BEFORE_QUERY is a valid regex pattern")
});

/// `;jsessionid=` run with a non-empty value through end of input.
static JSESSIONID_TO_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r";jsessionid=.*?[^?].*$").expect("JSESSIONID_TO_END is a valid regex pattern")
});

/// Normalize a service URL for comparison.
///
/// URL-decodes the parameter (form semantics: `+` is a space), then strips
/// `;jsessionid=…`. The "followed by `?`" case must run first; otherwise the
/// to-end pass would swallow the query string.
pub fn sanitize(parameter: &str) -> String {
    let decoded = url_decode(parameter);
    let without_query_case = JSESSIONID_BEFORE_QUERY.replace_all(&decoded, "?");
    JSESSIONID_TO_END
        .replace_all(&without_query_case, "")
        .into_owned()
}

fn url_decode(parameter: &str) -> String {
    let plus_as_space = parameter.replace('+', " ");
    let bytes = urlencoding::decode_binary(plus_as_space.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_trailing_session_id() {
        assert_eq!(
            sanitize("https://svc.example.org/app;jsessionid=ABC123"),
            "https://svc.example.org/app"
        );
    }

    #[test]
    fn strips_session_id_before_query() {
        assert_eq!(
            sanitize("https://svc.example.org/app;jsessionid=ABC123?a=1&b=2"),
            "https://svc.example.org/app?a=1&b=2"
        );
    }

    #[test]
    fn strips_only_through_first_question_mark() {
        assert_eq!(
            sanitize("https://svc/app;jsessionid=X?next=/a?b"),
            "https://svc/app?next=/a?b"
        );
    }

    #[test]
    fn url_decodes_before_stripping() {
        assert_eq!(
            sanitize("https%3A%2F%2Fsvc.example.org%2Fapp%3Bjsessionid%3DXYZ"),
            "https://svc.example.org/app"
        );
        assert_eq!(sanitize("https://svc/a+b"), "https://svc/a b");
    }

    #[test]
    fn leaves_urls_without_session_id_alone() {
        let url = "https://svc.example.org/app?x=1";
        assert_eq!(sanitize(url), url);
    }

    #[test]
    fn empty_session_value_with_query() {
        assert_eq!(sanitize("https://svc/app;jsessionid=?q=1"), "https://svc/app?q=1");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: normalizing twice equals normalizing once (inputs in decoded form).
        #[test]
        fn sanitize_is_idempotent(
            base in "https://[a-z]{1,10}\\.example\\.org/[a-z/]{0,12}",
            session in proptest::option::of("[A-Za-z0-9]{1,10}"),
            query in proptest::option::of("[a-z]{1,5}=[a-z0-9?/]{0,8}"),
        ) {
            let mut url = base;
            if let Some(s) = session {
                url.push_str(";jsessionid=");
                url.push_str(&s);
            }
            if let Some(q) = query {
                url.push('?');
                url.push_str(&q);
            }

            let once = sanitize(&url);
            prop_assert_eq!(sanitize(&once), once.clone());
            prop_assert!(!once.contains(";jsessionid="));
        }

        /// Property: the session segment never changes the comparison result.
        #[test]
        fn session_segment_is_invisible(
            base in "https://[a-z]{1,10}/[a-z]{0,8}",
            session in "[A-Z0-9]{1,12}",
        ) {
            let with_session = format!("{base};jsessionid={session}");
            prop_assert_eq!(sanitize(&with_session), sanitize(&base));
        }
    }
}
