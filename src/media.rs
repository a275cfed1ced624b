//! Media types and `Accept` header negotiation.
//!
//! Two wire formats exist: JSON and XML. JSON is the default whenever
//! neither side says otherwise.

use std::fmt;

/// A supported wire format.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MediaType {
    Json, // application/json
    Xml,  // application/xml, text/xml
}

impl MediaType {
    /// The value written to the `content-type` response header.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml  => "application/xml",
        }
    }

    /// Parses a `Content-Type` header value, ignoring parameters such as
    /// `charset`. Returns `None` for anything that is neither JSON nor XML.
    pub fn from_content_type(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        let (ty, sub) = essence.split_once('/')?;
        [Self::Json, Self::Xml].into_iter().find(|m| m.is(ty, sub))
    }

    /// Exact (non-wildcard) type match, including `+json` / `+xml` suffixes.
    fn is(self, ty: &str, sub: &str) -> bool {
        match self {
            Self::Json => ty == "application" && (sub == "json" || sub.ends_with("+json")),
            Self::Xml  => (ty == "application" || ty == "text") && (sub == "xml" || sub.ends_with("+xml")),
        }
    }

    fn top_level(self) -> &'static [&'static str] {
        match self {
            Self::Json => &["application"],
            Self::Xml  => &["application", "text"],
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Accept ────────────────────────────────────────────────────────────────────

/// One entry of an `Accept` header.
#[derive(Clone, Debug, PartialEq)]
struct MediaRange {
    ty: String,
    sub: String,
    /// Quality in thousandths, so ranges order without floats.
    q: u16,
}

impl MediaRange {
    fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';');
        let essence = parts.next()?.trim().to_ascii_lowercase();
        let (ty, sub) = essence.split_once('/')?;
        if ty.is_empty() || sub.is_empty() || (ty == "*" && sub != "*") {
            return None;
        }
        let mut q = 1000;
        for param in parts {
            if let Some((k, v)) = param.split_once('=') {
                if k.trim().eq_ignore_ascii_case("q") {
                    q = parse_qvalue(v.trim())?;
                }
            }
        }
        Some(Self { ty: ty.to_owned(), sub: sub.to_owned(), q })
    }

    /// 2 = exact, 1 = `type/*`, 0 = `*/*`; `None` when the range does not cover `media`.
    fn specificity(&self, media: MediaType) -> Option<u8> {
        if self.ty == "*" {
            Some(0)
        } else if self.sub == "*" {
            media.top_level().contains(&self.ty.as_str()).then_some(1)
        } else {
            media.is(&self.ty, &self.sub).then_some(2)
        }
    }
}

/// RFC 9110 `qvalue` in thousandths: `0` to `1` with at most three decimals.
fn parse_qvalue(raw: &str) -> Option<u16> {
    let (int, frac) = raw.split_once('.').unwrap_or((raw, ""));
    if frac.len() > 3 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let thousandths = frac
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(3)
        .fold(0u16, |acc, b| acc * 10 + u16::from(b - b'0'));
    match int {
        "0" => Some(thousandths),
        "1" if thousandths == 0 => Some(1000),
        _ => None,
    }
}

/// A parsed `Accept` header, entries kept in the order the client sent them.
#[derive(Clone, Debug, PartialEq)]
pub struct Accept {
    ranges: Vec<MediaRange>,
}

impl Accept {
    /// Parses an `Accept` header. A missing, empty or entirely unparseable
    /// header accepts anything.
    pub fn parse(header: Option<&str>) -> Self {
        let ranges: Vec<_> = header
            .unwrap_or("")
            .split(',')
            .filter_map(MediaRange::parse)
            .collect();
        if ranges.is_empty() { Self::any() } else { Self { ranges } }
    }

    /// `*/*`.
    pub fn any() -> Self {
        Self { ranges: vec![MediaRange { ty: "*".into(), sub: "*".into(), q: 1000 }] }
    }

    /// Picks the produced type the client prefers most.
    ///
    /// Each candidate is weighed by the most specific range that covers it,
    /// so `application/xml;q=0, */*` rules XML out. Highest quality wins;
    /// equal quality goes to the range the client listed first, then to the
    /// order of `produced`.
    pub fn negotiate(&self, produced: &[MediaType]) -> Option<MediaType> {
        produced
            .iter()
            .enumerate()
            .filter_map(|(server_rank, &media)| {
                let (index, range) = self
                    .ranges
                    .iter()
                    .enumerate()
                    .filter_map(|(i, r)| r.specificity(media).map(|s| (s, i, r)))
                    .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
                    .map(|(_, i, r)| (i, r))?;
                (range.q > 0).then_some((range.q, index, server_rank, media))
            })
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then(b.2.cmp(&a.2)))
            .map(|(.., media)| media)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const BOTH: &[MediaType] = &[MediaType::Json, MediaType::Xml];

    #[rstest]
    #[case::json("application/json", Some(MediaType::Json))]
    #[case::json_charset("application/json; charset=utf-8", Some(MediaType::Json))]
    #[case::problem_json("application/problem+json", Some(MediaType::Json))]
    #[case::text_xml("text/xml", Some(MediaType::Xml))]
    #[case::upper("Application/XML", Some(MediaType::Xml))]
    #[case::form("application/x-www-form-urlencoded", None)]
    #[case::garbage("nonsense", None)]
    fn content_type_parsing(#[case] raw: &str, #[case] expected: Option<MediaType>) {
        assert_eq!(MediaType::from_content_type(raw), expected);
    }

    #[rstest]
    #[case::absent(None, BOTH, Some(MediaType::Json))]
    #[case::wildcard(Some("*/*"), BOTH, Some(MediaType::Json))]
    #[case::xml_only_server(Some("*/*"), &[MediaType::Xml], Some(MediaType::Xml))]
    #[case::explicit_xml(Some("application/xml"), BOTH, Some(MediaType::Xml))]
    #[case::xml_against_json(Some("application/xml"), &[MediaType::Json], None)]
    #[case::client_order(Some("application/xml, application/json"), BOTH, Some(MediaType::Xml))]
    #[case::quality(Some("application/xml;q=0.5, application/json"), BOTH, Some(MediaType::Json))]
    #[case::excluded(Some("application/json;q=0, */*"), BOTH, Some(MediaType::Xml))]
    #[case::text_family(Some("text/*"), BOTH, Some(MediaType::Xml))]
    #[case::html_only(Some("text/html"), BOTH, None)]
    #[case::unparseable(Some(";;;"), BOTH, Some(MediaType::Json))]
    fn negotiation(
        #[case] header: Option<&str>,
        #[case] produced: &[MediaType],
        #[case] expected: Option<MediaType>,
    ) {
        assert_eq!(Accept::parse(header).negotiate(produced), expected);
    }

    #[rstest]
    #[case::one("1", Some(1000))]
    #[case::one_point_zero("1.000", Some(1000))]
    #[case::zero("0", Some(0))]
    #[case::half("0.5", Some(500))]
    #[case::smallest("0.001", Some(1))]
    #[case::trailing_dot("0.", Some(0))]
    #[case::four_decimals("0.0001", None)]
    #[case::above_one("1.5", None)]
    #[case::leading_dot(".5", None)]
    #[case::negative("-0.5", None)]
    #[case::exponent("1e-3", None)]
    fn qvalue_parsing(#[case] raw: &str, #[case] expected: Option<u16>) {
        assert_eq!(parse_qvalue(raw), expected);
    }

    #[test]
    fn smallest_positive_quality_still_accepts() {
        let accept = Accept::parse(Some("application/json;q=0, application/xml;q=0.001"));
        assert_eq!(accept.negotiate(BOTH), Some(MediaType::Xml));

        let accept = Accept::parse(Some("application/xml;q=0.0001, application/json;q=0.5"));
        assert_eq!(accept.negotiate(BOTH), Some(MediaType::Json));
    }

    #[test]
    fn out_of_range_quality_is_ignored() {
        let accept = Accept::parse(Some("application/xml;q=2, application/json"));
        assert_eq!(accept.negotiate(BOTH), Some(MediaType::Json));
    }
}
