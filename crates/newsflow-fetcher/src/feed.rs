//! RSS/Atom feed fetching and parsing.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::FetchError;
use crate::types::FeedItem;

/// Fetch a feed URL and parse its items.
///
/// # Errors
///
/// Returns [`FetchError::Http`] on network failure, [`FetchError::Status`]
/// on a non-2xx response, or [`FetchError::Xml`] on malformed XML.
pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<Vec<FeedItem>, FetchError> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(FetchError::Status(response.status().as_u16()));
    }
    let body = response.text().await?;
    parse_feed(&body)
}

/// Parse an RSS 2.0 or Atom feed body into [`FeedItem`]s.
///
/// RSS `<item>` and Atom `<entry>` elements are treated uniformly:
/// `guid`/`id` become the guid, `pubDate`/`published`/`updated` the
/// timestamp, `description`/`summary` the excerpt (HTML stripped), and
/// `enclosure`/`media:content` URLs with an image type the image.
///
/// # Errors
///
/// Returns [`FetchError::Xml`] if the XML is malformed.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, FetchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current = FeedItem::default();
    let mut in_item = false;
    let mut current_tag = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                match name.as_str() {
                    "item" | "entry" => {
                        in_item = true;
                        current = FeedItem::default();
                    }
                    // Atom links carry the URL in an href attribute.
                    "link" if in_item => {
                        if let Some(href) = attr_value(&e, b"href") {
                            current.link = href;
                        }
                        current_tag = name;
                    }
                    _ => {
                        if in_item && matches!(name.as_str(), "enclosure" | "content" | "thumbnail")
                        {
                            capture_image(&mut current, &e);
                        }
                        current_tag = name;
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if in_item {
                    let name = local_name(&e);
                    match name.as_str() {
                        "link" => {
                            if let Some(href) = attr_value(&e, b"href") {
                                current.link = href;
                            }
                        }
                        "enclosure" | "content" | "thumbnail" => capture_image(&mut current, &e),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let raw = e.name();
                let name = std::str::from_utf8(raw.as_ref())
                    .unwrap_or("")
                    .rsplit(':')
                    .next()
                    .unwrap_or("")
                    .to_string();
                if (name == "item" || name == "entry") && in_item {
                    in_item = false;
                    if !current.link.is_empty() && !current.title.is_empty() {
                        items.push(std::mem::take(&mut current));
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if in_item {
                    let text = e.unescape().unwrap_or_default().into_owned();
                    apply_text(&mut current, &current_tag, text);
                }
            }
            Ok(Event::CData(e)) => {
                if in_item {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    apply_text(&mut current, &current_tag, text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FetchError::Xml(e)),
            _ => {}
        }
    }

    Ok(items)
}

/// Route element text into the item field named by `tag`.
fn apply_text(item: &mut FeedItem, tag: &str, text: String) {
    match tag {
        "title" => item.title = text,
        "link" if item.link.is_empty() => item.link = text,
        "guid" | "id" => item.guid = Some(text),
        "pubDate" | "published" | "updated" => {
            if item.published_at.is_none() {
                item.published_at = parse_date(&text);
            }
        }
        "description" | "summary" => item.description = Some(strip_html(&text)),
        _ => {}
    }
}

/// Pull an image URL out of `enclosure`/`media:content`/`media:thumbnail`.
fn capture_image(item: &mut FeedItem, e: &BytesStart<'_>) {
    if item.image_url.is_some() {
        return;
    }
    let mime = attr_value(e, b"type");
    if let Some(mime) = &mime {
        if !mime.starts_with("image/") {
            return;
        }
    }
    if let Some(url) = attr_value(e, b"url") {
        item.image_url = Some(url);
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    std::str::from_utf8(e.name().as_ref())
        .unwrap_or("")
        .rsplit(':')
        .next()
        .unwrap_or("")
        .to_string()
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok())
        .map(std::borrow::Cow::into_owned)
}

/// Accept RFC 2822 (RSS) and RFC 3339 (Atom) timestamps.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Strip HTML tags from a string, returning plain text.
fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Example News</title>
    <item>
      <title>Floods displace thousands in southern districts</title>
      <link>https://example.com/news/floods</link>
      <guid>flood-2025-001</guid>
      <pubDate>Mon, 18 Aug 2025 06:30:00 +0000</pubDate>
      <description>&lt;p&gt;Heavy monsoon rain continued overnight.&lt;/p&gt;</description>
      <enclosure url="https://example.com/img/floods.jpg" type="image/jpeg" length="1024"/>
    </item>
    <item>
      <title>Cabinet approves new energy policy</title>
      <link>https://example.com/news/energy</link>
      <description>The policy targets 70 percent renewables.</description>
    </item>
  </channel>
</rss>"#;

    const SAMPLE_ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Atom</title>
  <entry>
    <title>Port city project resumes</title>
    <link href="https://example.com/news/port-city"/>
    <id>urn:uuid:port-city-1</id>
    <published>2025-08-18T09:00:00Z</published>
    <summary>Construction resumed after a two-month pause.</summary>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_items() {
        let items = parse_feed(SAMPLE_RSS).expect("should parse valid RSS");
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.title, "Floods displace thousands in southern districts");
        assert_eq!(first.link, "https://example.com/news/floods");
        assert_eq!(first.guid.as_deref(), Some("flood-2025-001"));
        assert!(first.published_at.is_some());
        assert_eq!(
            first.description.as_deref(),
            Some("Heavy monsoon rain continued overnight.")
        );
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://example.com/img/floods.jpg")
        );

        let second = &items[1];
        assert!(second.guid.is_none());
        assert!(second.published_at.is_none());
        assert!(second.image_url.is_none());
    }

    #[test]
    fn parses_atom_entries() {
        let items = parse_feed(SAMPLE_ATOM).expect("should parse valid Atom");
        assert_eq!(items.len(), 1);
        let entry = &items[0];
        assert_eq!(entry.title, "Port city project resumes");
        assert_eq!(entry.link, "https://example.com/news/port-city");
        assert_eq!(entry.guid.as_deref(), Some("urn:uuid:port-city-1"));
        assert!(entry.published_at.is_some());
        assert_eq!(
            entry.description.as_deref(),
            Some("Construction resumed after a two-month pause.")
        );
    }

    #[test]
    fn empty_feed_returns_empty_vec() {
        let xml = r#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#;
        let items = parse_feed(xml).expect("should parse empty RSS");
        assert!(items.is_empty());
    }

    #[test]
    fn items_without_link_or_title_are_dropped() {
        let xml = r"<rss><channel><item><title>No link here</title></item></channel></rss>";
        let items = parse_feed(xml).expect("should parse");
        assert!(items.is_empty());
    }

    #[test]
    fn non_image_enclosures_are_ignored() {
        let xml = r#"<rss><channel><item>
            <title>Podcast episode</title>
            <link>https://example.com/ep1</link>
            <enclosure url="https://example.com/ep1.mp3" type="audio/mpeg"/>
        </item></channel></rss>"#;
        let items = parse_feed(xml).expect("should parse");
        assert_eq!(items.len(), 1);
        assert!(items[0].image_url.is_none());
    }

    #[test]
    fn malformed_xml_is_handled_gracefully() {
        let xml = "<rss><channel><item><title>Unclosed";
        match parse_feed(xml) {
            Ok(items) => assert!(items.is_empty()),
            Err(FetchError::Xml(_)) => {}
            Err(e) => panic!("unexpected error type: {e}"),
        }
    }

    #[test]
    fn strip_html_removes_tags() {
        assert_eq!(strip_html("<p>hello <b>world</b></p>"), "hello world");
        assert_eq!(strip_html("plain"), "plain");
    }
}
