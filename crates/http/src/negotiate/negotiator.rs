use http::{HeaderMap, header};
use tracing::trace;

use super::{EncodingConfig, EncodingDecision};

/// Picks the encoding of each response from the request and response metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingNegotiator {
    config: EncodingConfig,
}

impl EncodingNegotiator {
    pub fn new(config: EncodingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncodingConfig {
        &self.config
    }

    /// Decides how a body of `content_length` bytes (`None` when unknown) is sent.
    pub fn decide(&self, request_headers: &HeaderMap, content_length: Option<u64>, close_connection: bool) -> EncodingDecision {
        self.decide_encoded(request_headers, false, content_length, close_connection)
    }

    /// Like [`decide`](Self::decide), but leaves bodies that already carry a
    /// `Content-Encoding` untouched.
    pub fn decide_for_response(
        &self,
        request_headers: &HeaderMap,
        response_headers: &HeaderMap,
        content_length: Option<u64>,
        close_connection: bool,
    ) -> EncodingDecision {
        let already_encoded = response_headers.contains_key(header::CONTENT_ENCODING);
        self.decide_encoded(request_headers, already_encoded, content_length, close_connection)
    }

    fn decide_encoded(
        &self,
        request_headers: &HeaderMap,
        already_encoded: bool,
        content_length: Option<u64>,
        close_connection: bool,
    ) -> EncodingDecision {
        let accepts_gzip = accepts_encoding(request_headers, "gzip");
        let use_gzip = self.config.gzip && !already_encoded && accepts_gzip;

        let decision = EncodingDecision::new(content_length, accepts_gzip, use_gzip, close_connection);
        trace!(
            content_length = ?content_length,
            use_gzip = decision.use_gzip(),
            use_chunked = decision.use_chunked(),
            connection = decision.connection(),
            "negotiated response encoding"
        );
        decision
    }
}

/// Whether `Accept-Encoding` lists `coding`.
///
/// Tokens are matched case-insensitively after trimming; parameters after `;` are
/// ignored except for `q=0`, which rejects the token.
pub fn accepts_encoding(request_headers: &HeaderMap, coding: &str) -> bool {
    request_headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|item| {
            let mut parts = item.split(';');
            let token = parts.next().unwrap_or_default().trim();
            token.eq_ignore_ascii_case(coding) && !parts.any(is_zero_quality)
        })
}

fn is_zero_quality(param: &str) -> bool {
    let Some((name, value)) = param.split_once('=') else {
        return false;
    };
    name.trim().eq_ignore_ascii_case("q") && value.trim().parse::<f32>().is_ok_and(|q| q <= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn accept(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn token_matching() {
        assert!(accepts_encoding(&accept("gzip"), "gzip"));
        assert!(accepts_encoding(&accept("deflate, GZIP"), "gzip"));
        assert!(accepts_encoding(&accept(" br ,gzip;q=0.5"), "gzip"));
        assert!(!accepts_encoding(&accept("gzip;q=0"), "gzip"));
        assert!(!accepts_encoding(&accept("gzip;q=0.000"), "gzip"));
        assert!(!accepts_encoding(&accept("x-gzip, deflate"), "gzip"));
        assert!(!accepts_encoding(&HeaderMap::new(), "gzip"));
    }

    #[test]
    fn deflate_is_never_selected() {
        let negotiator = EncodingNegotiator::new(EncodingConfig::default().with_gzip(true));
        let decision = negotiator.decide(&accept("deflate"), Some(100), false);

        assert!(!decision.use_gzip());
        assert!(!decision.accepts_gzip());
        assert!(!decision.use_chunked());
    }

    #[test]
    fn gzip_requires_config() {
        let request = accept("gzip");

        let off = EncodingNegotiator::default().decide(&request, Some(100), false);
        assert!(off.accepts_gzip());
        assert!(!off.use_gzip());
        assert!(!off.use_chunked());

        let on = EncodingNegotiator::new(EncodingConfig::default().with_gzip(true)).decide(&request, Some(100), false);
        assert!(on.use_gzip());
        assert!(on.use_chunked());
    }

    #[test]
    fn four_combinations() {
        let negotiator = EncodingNegotiator::new(EncodingConfig::default().with_gzip(true));
        let gzip = accept("gzip");
        let plain = HeaderMap::new();

        let cases = [
            (&plain, Some(5), false, false),
            (&plain, None, false, true),
            (&gzip, Some(5), true, true),
            (&gzip, None, true, true),
        ];

        for (headers, length, use_gzip, use_chunked) in cases {
            let decision = negotiator.decide(headers, length, false);
            assert_eq!(decision.use_gzip(), use_gzip, "{length:?}");
            assert_eq!(decision.use_chunked(), use_chunked, "{length:?}");
            assert_eq!(decision.use_chunked(), decision.use_gzip() || decision.content_length().is_none());
        }
    }

    #[test]
    fn already_encoded_response_is_passed_through() {
        let negotiator = EncodingNegotiator::new(EncodingConfig::default().with_gzip(true));
        let mut response_headers = HeaderMap::new();
        response_headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("br"));

        let decision = negotiator.decide_for_response(&accept("gzip"), &response_headers, Some(7), true);
        assert!(!decision.use_gzip());
        assert!(!decision.use_chunked());
        assert_eq!(decision.connection(), "close");
    }
}
