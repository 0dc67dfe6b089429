//! Fetch response normalization
//!
//! Turns the raw RFC 2822 data returned by the transport into typed
//! message fields.

use chrono::{DateTime, NaiveDate, NaiveTime};
use mailparse::{MailHeaderMap, ParsedMail, dateparse};

use crate::error::{Error, Result};

/// Header-derived fields of one message
#[derive(Debug, Clone)]
pub(crate) struct ParsedHeaders {
    pub to: Option<String>,
    pub from: Option<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: Option<String>,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// Parse the header block of a message (the payload of a header-only
/// fetch).
pub(crate) fn parse_headers(raw: &[u8]) -> Result<ParsedHeaders> {
    let parsed = parse(raw)?;
    headers_of(&parsed)
}

/// Parse a full message into its header fields and body text.
pub(crate) fn parse_message(raw: &[u8]) -> Result<(ParsedHeaders, Option<String>)> {
    let parsed = parse(raw)?;
    let headers = headers_of(&parsed)?;
    let text = extract_text(&parsed);
    Ok((headers, text))
}

/// Decode the payload of a body-only fetch as text.
pub(crate) fn body_text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn parse(raw: &[u8]) -> Result<ParsedMail<'_>> {
    mailparse::parse_mail(raw)
        .map_err(|e| Error::Transport(format!("malformed fetch response: {e}")))
}

fn headers_of(parsed: &ParsedMail<'_>) -> Result<ParsedHeaders> {
    let headers = parsed.get_headers();

    let raw_date = headers
        .get_first_value("Date")
        .ok_or_else(|| Error::DateParse("missing Date header".to_string()))?;
    let epoch = dateparse(&raw_date).map_err(|e| Error::DateParse(format!("{raw_date:?}: {e}")))?;
    let moment = DateTime::from_timestamp(epoch, 0)
        .ok_or_else(|| Error::DateParse(format!("{raw_date:?}: timestamp out of range")))?;

    Ok(ParsedHeaders {
        to: headers.get_first_value("To"),
        from: headers.get_first_value("From"),
        cc: headers.get_first_value("Cc"),
        bcc: headers.get_first_value("Bcc"),
        subject: headers.get_first_value("Subject"),
        date: moment.date_naive(),
        time: moment.time(),
    })
}

/// Extract the plain text body: the first text/plain part wins, falling
/// back to the top-level body for non-multipart messages.
fn extract_text(parsed: &ParsedMail<'_>) -> Option<String> {
    if parsed.subparts.is_empty() {
        return parsed.get_body().ok();
    }
    find_plain_text(&parsed.subparts)
}

/// Recursively search message parts for text/plain content
fn find_plain_text(parts: &[ParsedMail<'_>]) -> Option<String> {
    for part in parts {
        if part.ctype.mimetype.eq_ignore_ascii_case("text/plain")
            && let Ok(body) = part.get_body()
        {
            return Some(body);
        }
        if !part.subparts.is_empty()
            && let Some(body) = find_plain_text(&part.subparts)
        {
            return Some(body);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER_BLOCK: &[u8] = b"From: Alice <alice@example.com>\r\n\
To: bob@example.com\r\n\
Subject: Quarterly invoice\r\n\
Date: Fri, 5 Jan 2024 14:30:00 +0000\r\n\
\r\n";

    #[test]
    fn test_parse_headers_extracts_fields_verbatim() {
        let headers = parse_headers(HEADER_BLOCK).unwrap();
        assert_eq!(headers.from.as_deref(), Some("Alice <alice@example.com>"));
        assert_eq!(headers.to.as_deref(), Some("bob@example.com"));
        assert_eq!(headers.subject.as_deref(), Some("Quarterly invoice"));
        assert_eq!(headers.cc, None);
        assert_eq!(headers.bcc, None);
    }

    #[test]
    fn test_parse_headers_splits_date_and_time() {
        let headers = parse_headers(HEADER_BLOCK).unwrap();
        assert_eq!(
            headers.date,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert_eq!(
            headers.time,
            NaiveTime::from_hms_opt(14, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_missing_date_is_an_error() {
        let raw = b"From: a@example.com\r\nSubject: hi\r\n\r\n";
        assert!(matches!(parse_headers(raw), Err(Error::DateParse(_))));
    }

    #[test]
    fn test_malformed_date_is_an_error() {
        let raw = b"From: a@example.com\r\nDate: yesterday-ish\r\n\r\n";
        assert!(matches!(parse_headers(raw), Err(Error::DateParse(_))));
    }

    #[test]
    fn test_parse_message_returns_body() {
        let raw = b"From: a@example.com\r\n\
Date: Fri, 5 Jan 2024 14:30:00 +0000\r\n\
\r\n\
hello world\r\n";
        let (_, text) = parse_message(raw).unwrap();
        assert_eq!(text.as_deref().map(str::trim_end), Some("hello world"));
    }

    #[test]
    fn test_parse_message_prefers_plain_text_part() {
        let raw = b"From: a@example.com\r\n\
Date: Fri, 5 Jan 2024 14:30:00 +0000\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/alternative; boundary=\"sep\"\r\n\
\r\n\
--sep\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>hello</p>\r\n\
--sep\r\n\
Content-Type: text/plain\r\n\
\r\n\
hello\r\n\
--sep--\r\n";
        let (_, text) = parse_message(raw).unwrap();
        assert_eq!(text.as_deref().map(str::trim_end), Some("hello"));
    }

    #[test]
    fn test_body_text_is_lossy() {
        assert_eq!(body_text(b"plain body"), "plain body");
        assert_eq!(body_text(&[0x68, 0x69, 0xFF]), "hi\u{FFFD}");
    }
}
