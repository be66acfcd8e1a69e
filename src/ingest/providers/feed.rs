// src/ingest/providers/feed.rs
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::ingest::types::{RawItem, SourceProvider};

/// Document kinds we read, told apart by the root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    /// RSS 0.9x / 2.0: `rss/channel/item`
    Rss,
    /// RSS 1.0: `rdf:RDF/item`, items are siblings of `channel`
    Rdf,
    /// Atom: `feed/entry`
    Atom,
}

impl Format {
    fn from_root(name: &[u8]) -> Option<Self> {
        match name {
            b"rss" => Some(Self::Rss),
            b"rdf:RDF" | b"RDF" => Some(Self::Rdf),
            b"feed" => Some(Self::Atom),
            _ => None,
        }
    }

    fn entry_tag(self) -> &'static [u8] {
        match self {
            Self::Atom => b"entry",
            Self::Rss | Self::Rdf => b"item",
        }
    }
}

/// Child elements of an item/entry we keep. Prefixed extensions such as
/// `media:title` or `atom:link` never match, except `dc:date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Guid,
    Title,
    Link,
    PubDate,
    DcDate,
    Published,
    Updated,
}

impl Field {
    fn from_tag(format: Format, tag: &[u8]) -> Option<Self> {
        match (format, tag) {
            (_, b"title") => Some(Self::Title),
            (Format::Atom, b"id") => Some(Self::Guid),
            (Format::Atom, b"published") => Some(Self::Published),
            (Format::Atom, b"updated") => Some(Self::Updated),
            (Format::Atom, _) => None,
            (_, b"guid") => Some(Self::Guid),
            (_, b"link") => Some(Self::Link),
            (_, b"pubDate") => Some(Self::PubDate),
            (_, b"dc:date") => Some(Self::DcDate),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct AtomLink {
    href: String,
    rel: Option<String>,
}

/// Fields collected for one item/entry. The first non-blank value of each
/// field wins.
#[derive(Debug, Default)]
struct Entry {
    guid: Option<String>,
    title: Option<String>,
    link: Option<String>,
    pub_date: Option<String>,
    dc_date: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    links: Vec<AtomLink>,
}

impl Entry {
    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Guid => &mut self.guid,
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::PubDate => &mut self.pub_date,
            Field::DcDate => &mut self.dc_date,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
        };
        let value = value.trim();
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }

    fn push_link(&mut self, e: &BytesStart<'_>) {
        let mut href = None;
        let mut rel = None;
        for attr in e.attributes().flatten() {
            let Ok(value) = attr.unescape_value() else {
                continue;
            };
            match attr.key.as_ref() {
                b"href" => href = Some(value.trim().to_string()),
                b"rel" => rel = Some(value.trim().to_string()),
                _ => {}
            }
        }
        if let Some(href) = href.filter(|h| !h.is_empty()) {
            self.links.push(AtomLink { href, rel });
        }
    }

    /// `rel="alternate"` wins; a link without `rel` means alternate too.
    fn alternate_href(&self) -> Option<String> {
        self.links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .map(|l| l.href.clone())
    }

    fn into_raw(self, format: Format, source: &str) -> RawItem {
        let (link, pub_date) = match format {
            Format::Atom => (self.alternate_href(), self.published.or(self.updated)),
            Format::Rss | Format::Rdf => (self.link, self.pub_date.or(self.dc_date)),
        };
        RawItem {
            guid: self.guid,
            title: self.title,
            link,
            pub_date,
            source: source.to_string(),
        }
    }
}

/// Walk the document once and collect the entries under its root.
fn read_entries(xml: &str) -> Result<(Format, Vec<Entry>)> {
    let mut reader = Reader::from_str(xml);
    let mut format: Option<Format> = None;
    let mut entries = Vec::new();
    // (depth, fields) of the open item/entry
    let mut entry: Option<(usize, Entry)> = None;
    // (depth, field, text so far) of the open field element
    let mut field: Option<(usize, Field, String)> = None;
    let mut depth = 0usize;

    loop {
        let event = match reader.read_event() {
            Ok(ev) => ev,
            Err(e) => {
                let pos = reader.buffer_position();
                return Err(anyhow!(e).context(format!("malformed xml near byte {pos}")));
            }
        };
        match event {
            Event::Eof => break,
            Event::Start(e) => {
                depth += 1;
                let Some(fmt) = format else {
                    format = Some(detect(&e)?);
                    continue;
                };
                let name = e.name();
                let name = name.as_ref();
                match entry.as_mut() {
                    None => {
                        if name == fmt.entry_tag() {
                            entry = Some((depth, Entry::default()));
                        }
                    }
                    Some((d, fields)) if depth == *d + 1 && field.is_none() => {
                        if fmt == Format::Atom && name == b"link" {
                            fields.push_link(&e);
                        } else if let Some(f) = Field::from_tag(fmt, name) {
                            field = Some((depth, f, String::new()));
                        }
                    }
                    Some(_) => {}
                }
            }
            Event::Empty(e) => {
                let Some(fmt) = format else {
                    format = Some(detect(&e)?);
                    continue;
                };
                if let Some((d, fields)) = entry.as_mut() {
                    if depth == *d && fmt == Format::Atom && e.name().as_ref() == b"link" {
                        fields.push_link(&e);
                    }
                }
            }
            Event::Text(t) => {
                if let Some((_, _, buf)) = field.as_mut() {
                    match t.unescape() {
                        Ok(s) => buf.push_str(&s),
                        Err(_) => buf.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Event::CData(c) => {
                if let Some((_, _, buf)) = field.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                if field.as_ref().is_some_and(|(d, ..)| *d == depth) {
                    if let (Some((_, f, text)), Some((_, fields))) = (field.take(), entry.as_mut()) {
                        fields.set(f, text);
                    }
                } else if entry.as_ref().is_some_and(|(d, _)| *d == depth) {
                    if let Some((_, fields)) = entry.take() {
                        entries.push(fields);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    match format {
        Some(fmt) => Ok((fmt, entries)),
        None => bail!("no root element"),
    }
}

fn detect(root: &BytesStart<'_>) -> Result<Format> {
    let name = root.name();
    Format::from_root(name.as_ref()).ok_or_else(|| {
        anyhow!(
            "unrecognised feed root <{}>",
            String::from_utf8_lossy(name.as_ref())
        )
    })
}

/// Parse an RSS 2.0, RSS 1.0 (RDF) or Atom document into raw items tagged
/// with `source`. A document with any other root element is an error.
pub fn parse_feed(xml: &str, source: &str) -> Result<Vec<RawItem>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);

    let (format, entries) =
        read_entries(&xml_clean).with_context(|| format!("parsing feed from {source}"))?;
    let items: Vec<RawItem> = entries
        .into_iter()
        .map(|e| e.into_raw(format, source))
        .collect();

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("feed_items_parsed_total").increment(items.len() as u64);
    Ok(items)
}

pub struct FeedProvider {
    name: String,
    mode: Mode,
}

enum Mode {
    // Owned copy so fixtures need not be 'static.
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl FeedProvider {
    pub fn from_fixture(name: &str, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(url: &str, client: reqwest::Client) -> Self {
        Self {
            name: url.to_string(),
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        }
    }
}

#[async_trait]
impl SourceProvider for FeedProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        match &self.mode {
            Mode::Fixture(s) => parse_feed(s, &self.name),
            Mode::Http { url, client } => {
                let body = client
                    .get(url.as_str())
                    .send()
                    .await
                    .with_context(|| format!("GET {url}"))?
                    .error_for_status()
                    .with_context(|| format!("GET {url}"))?
                    .text()
                    .await
                    .with_context(|| format!("reading body of {url}"))?;
                parse_feed(&body, &self.name)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// HTML entities that feeds use but XML does not define.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
