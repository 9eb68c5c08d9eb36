// src/ingest/feed.rs
//! RSS 2.0 / Atom normalizer.
//!
//! A streaming pass over the document that collects `item` (RSS) or `entry`
//! (Atom) elements into [`RawFeedItem`]s. Accepted encodings:
//! - title/description as plain text or CDATA, description taken from the first
//!   non-empty of `description`, `summary`, `content`, `content:encoded`
//! - link as element text (RSS) or `href` attribute (Atom, `rel="alternate"` preferred)
//! - dates from `pubDate`, `published`, `updated`, `dc:date` or `issued`
//!
//! Missing or unparseable dates become `now`. Items without a title are skipped.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::types::RawFeedItem;
use crate::ingest::{normalize_text, DESCRIPTION_MAX_CHARS};

/// Titles are not truncated, but a runaway title is still bounded.
const TITLE_MAX_CHARS: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    Link,
    Date,
    Skip,
}

#[derive(Debug)]
struct Cursor {
    field: Field,
    depth: usize,
    buf: String,
}

#[derive(Debug, Default)]
struct Entry {
    title: String,
    description: String,
    link: String,
    link_is_alternate: bool,
    date: Option<String>,
}

impl Entry {
    fn accept_href(&mut self, e: &BytesStart<'_>) -> bool {
        let href = match attr(e, "href") {
            Some(h) if !h.trim().is_empty() => h,
            _ => return false,
        };
        let alternate = matches!(attr(e, "rel").as_deref(), None | Some("alternate"));
        if self.link.is_empty() || (alternate && !self.link_is_alternate) {
            self.link = href.trim().to_string();
            self.link_is_alternate = alternate;
        }
        true
    }

    fn finish(&mut self, cursor: Cursor) {
        let value = cursor.buf.trim();
        match cursor.field {
            Field::Title if self.title.is_empty() => self.title = value.to_string(),
            Field::Description if self.description.is_empty() => {
                self.description = value.to_string()
            }
            Field::Link if self.link.is_empty() => self.link = value.to_string(),
            Field::Date if self.date.is_none() && !value.is_empty() => {
                self.date = Some(value.to_string())
            }
            _ => {}
        }
    }

    fn into_item(self, source_name: &str, now: DateTime<Utc>) -> Option<RawFeedItem> {
        let title = normalize_text(&self.title, TITLE_MAX_CHARS);
        if title.is_empty() {
            return None;
        }
        Some(RawFeedItem {
            title,
            description: normalize_text(&self.description, DESCRIPTION_MAX_CHARS),
            link: self.link,
            published_at: self
                .date
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or(now),
            source_name: source_name.to_string(),
        })
    }
}

fn attr(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

// Matched on the qualified name so `media:title` / `media:content` stay out.
fn field_for(qname: &[u8], entry: &Entry) -> Field {
    match qname {
        b"title" if entry.title.is_empty() => Field::Title,
        b"description" | b"summary" | b"content" | b"content:encoded"
            if entry.description.is_empty() =>
        {
            Field::Description
        }
        b"link" if entry.link.is_empty() => Field::Link,
        b"pubDate" | b"published" | b"updated" | b"dc:date" | b"issued"
            if entry.date.is_none() =>
        {
            Field::Date
        }
        _ => Field::Skip,
    }
}

/// Parse one feed document. At most `max_items` entries are returned.
pub fn parse_feed(
    xml: &str,
    source_name: &str,
    max_items: usize,
    now: DateTime<Utc>,
) -> Result<Vec<RawFeedItem>> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let mut reader = Reader::from_str(&xml_clean);
    {
        let cfg = reader.config_mut();
        cfg.trim_text(true);
        cfg.check_end_names = false;
    }

    let mut out = Vec::new();
    let mut entry: Option<Entry> = None;
    let mut cursor: Option<Cursor> = None;

    loop {
        if out.len() >= max_items {
            break;
        }
        let ev = reader
            .read_event()
            .with_context(|| format!("parsing feed xml at byte {}", reader.buffer_position()))?;
        match ev {
            Event::Start(e) => {
                if let Some(c) = cursor.as_mut() {
                    c.depth += 1;
                    continue;
                }
                let qname = e.name();
                if entry.is_none() {
                    if matches!(qname.as_ref(), b"item" | b"entry") {
                        entry = Some(Entry::default());
                    }
                } else if let Some(en) = entry.as_mut() {
                    let field = if qname.as_ref() == b"link" && en.accept_href(&e) {
                        Field::Skip
                    } else {
                        field_for(qname.as_ref(), en)
                    };
                    cursor = Some(Cursor {
                        field,
                        depth: 0,
                        buf: String::new(),
                    });
                }
            }
            Event::Empty(e) => {
                if cursor.is_none() && e.name().as_ref() == b"link" {
                    if let Some(en) = entry.as_mut() {
                        en.accept_href(&e);
                    }
                }
            }
            Event::Text(t) => {
                if let Some(c) = cursor.as_mut() {
                    let s = match t.unescape() {
                        Ok(s) => s.into_owned(),
                        Err(_) => html_escape::decode_html_entities(&String::from_utf8_lossy(&t))
                            .into_owned(),
                    };
                    push_chunk(&mut c.buf, &s);
                }
            }
            Event::CData(t) => {
                if let Some(c) = cursor.as_mut() {
                    let raw = t.into_inner();
                    push_chunk(&mut c.buf, &String::from_utf8_lossy(&raw));
                }
            }
            Event::End(e) => {
                if let Some(mut c) = cursor.take() {
                    if c.depth > 0 {
                        c.depth -= 1;
                        cursor = Some(c);
                    } else if let Some(en) = entry.as_mut() {
                        en.finish(c);
                    }
                    continue;
                }
                if matches!(e.name().as_ref(), b"item" | b"entry") {
                    if let Some(done) = entry.take() {
                        if let Some(item) = done.into_item(source_name, now) {
                            out.push(item);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

fn push_chunk(buf: &mut String, chunk: &str) {
    if chunk.is_empty() {
        return;
    }
    if !buf.is_empty() {
        buf.push(' ');
    }
    buf.push_str(chunk);
}

/// Accepts RFC 2822 (RSS), RFC 3339 (Atom, dc:date) and `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    let unix = OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .map(|dt| dt.unix_timestamp())
        .ok()
        // chrono is more lenient with obsolete zones ("EST", "PDT")
        .or_else(|| DateTime::parse_from_rfc2822(ts).ok().map(|d| d.timestamp()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|n| n.and_utc().timestamp())
        })?;
    Utc.timestamp_opt(unix, 0).single()
}

/// HTML entities that are not XML entities break the XML reader.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
        .replace("&euro;", "EUR ")
        .replace("&pound;", "GBP ")
        .replace("&trade;", "")
        .replace("&reg;", "")
        .replace("&copy;", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn rss_with_cdata_and_markup() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Channel title is ignored</title>
  <item>
    <title><![CDATA[Stocks <em>rally</em> as yields fall]]></title>
    <link>https://news.test/a</link>
    <description><![CDATA[<p>Markets&nbsp;climbed <b>sharply</b> today</p>]]></description>
    <pubDate>Tue, 14 Oct 2025 13:30:00 GMT</pubDate>
  </item>
</channel></rss>"#;
        let items = parse_feed(xml, "Test", 20, now()).unwrap();
        assert_eq!(items.len(), 1);
        let it = &items[0];
        assert_eq!(it.title, "Stocks rally as yields fall");
        assert_eq!(it.description, "Markets climbed sharply today");
        assert_eq!(it.link, "https://news.test/a");
        assert_eq!(it.published_at.to_rfc3339(), "2025-10-14T13:30:00+00:00");
        assert_eq!(it.source_name, "Test");
    }

    #[test]
    fn atom_prefers_alternate_href() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title type="html">Deal: 50% off headphones</title>
    <link rel="enclosure" href="https://cdn.test/img.jpg"/>
    <link rel="alternate" href="https://deals.test/1"/>
    <updated>2025-10-14T10:00:00Z</updated>
    <content type="html">&lt;p&gt;Today only&lt;/p&gt;</content>
  </entry>
</feed>"#;
        let items = parse_feed(xml, "Atom", 20, now()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://deals.test/1");
        assert_eq!(items[0].description, "Today only");
        assert_eq!(items[0].published_at.to_rfc3339(), "2025-10-14T10:00:00+00:00");
    }

    #[test]
    fn missing_or_bad_date_falls_back_to_now() {
        let xml = r#"<rss><channel>
  <item><title>No date</title></item>
  <item><title>Bad date</title><pubDate>yesterday-ish</pubDate></item>
</channel></rss>"#;
        let items = parse_feed(xml, "T", 20, now()).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.published_at == now()));
    }

    #[test]
    fn untitled_items_are_skipped_and_cap_applies() {
        let mut xml = String::from("<rss><channel><item><description>x</description></item>");
        for i in 0..30 {
            xml.push_str(&format!("<item><title>Item {i}</title></item>"));
        }
        xml.push_str("</channel></rss>");
        let items = parse_feed(&xml, "T", 25, now()).unwrap();
        assert_eq!(items.len(), 25);
        assert_eq!(items[0].title, "Item 0");
    }

    #[test]
    fn dc_date_is_accepted() {
        let xml = r#"<rss xmlns:dc="http://purl.org/dc/elements/1.1/"><channel>
  <item><title>Dated</title><dc:date>2025-03-01T08:00:00+02:00</dc:date></item>
</channel></rss>"#;
        let items = parse_feed(xml, "T", 20, now()).unwrap();
        assert_eq!(items[0].published_at.to_rfc3339(), "2025-03-01T06:00:00+00:00");
    }

    #[test]
    fn media_content_is_not_a_description() {
        let xml = r#"<rss xmlns:media="http://search.yahoo.com/mrss/"><channel>
  <item>
    <title>Photo story</title>
    <media:content url="https://img.test/a.jpg"><media:title>Caption</media:title></media:content>
    <description>Real summary</description>
  </item>
</channel></rss>"#;
        let items = parse_feed(xml, "T", 20, now()).unwrap();
        assert_eq!(items[0].title, "Photo story");
        assert_eq!(items[0].description, "Real summary");
    }

    #[test]
    fn timestamp_formats() {
        assert!(parse_timestamp("Mon, 13 Oct 2025 21:15:00 EST").is_some());
        assert!(parse_timestamp("2025-10-13 21:15:00").is_some());
        assert!(parse_timestamp("").is_none());
    }
}
