//! RSS 2.0 writer with the iTunes podcast namespace
//!
//! The document is written line by line with every text node and attribute
//! passed through [`quick_xml::escape::escape`]. Characters XML 1.0 forbids,
//! such as most C0 controls, are dropped first.

use bytes::Bytes;
use std::borrow::Cow;
use std::fmt::Write;
use std::time::Instant;
use tracing::debug;

use crate::errors::{FeedError, FeedResult};
use crate::models::{sort_by_recency, Feed, FeedItem};
use crate::utils::{format_rfc1123z, truncate_chars};

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";
pub const ITUNES_NAMESPACE: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
pub const ENCLOSURE_TYPE: &str = "audio/mpeg";

/// Podcast directories cut subtitles longer than this
const SUBTITLE_MAX_CHARS: usize = 255;

pub struct FeedSerializer {
    generator: String,
}

impl FeedSerializer {
    pub fn new(generator: impl Into<String>) -> Self {
        Self {
            generator: generator.into(),
        }
    }

    /// Write `feed` as an RSS document.
    ///
    /// Items are written from a re-sorted copy, so two equal feeds produce
    /// identical bytes whatever order their items were pushed in.
    pub fn serialize(&self, feed: &Feed) -> FeedResult<Bytes> {
        let started = Instant::now();

        let mut items = feed.items.clone();
        sort_by_recency(&mut items);

        let mut out = String::with_capacity(1024 + items.len() * 1024);
        self.write_document(&mut out, feed, &items)
            .map_err(|e| FeedError::serialization(format!("writing feed for {}: {e}", feed.channel.id)))?;

        debug!(
            "Serialized feed for {}: items={} bytes={} duration={}ms",
            feed.channel.id,
            items.len(),
            out.len(),
            started.elapsed().as_millis()
        );

        Ok(Bytes::from(out))
    }

    fn write_document(&self, out: &mut String, feed: &Feed, items: &[FeedItem]) -> std::fmt::Result {
        let channel = &feed.channel;

        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(out, r#"<rss version="2.0" xmlns:itunes="{ITUNES_NAMESPACE}">"#)?;
        writeln!(out, "  <channel>")?;
        text_element(out, 4, "title", &channel.title)?;
        text_element(out, 4, "link", &channel.page_url())?;
        text_element(out, 4, "description", &channel.description)?;
        text_element(out, 4, "generator", &self.generator)?;
        if let Some(last_build_date) = &feed.last_build_date {
            let formatted = format_rfc1123z(last_build_date);
            text_element(out, 4, "lastBuildDate", &formatted)?;
            text_element(out, 4, "pubDate", &formatted)?;
        }
        text_element(out, 4, "itunes:author", &channel.title)?;
        if let Some(thumbnail) = &channel.thumbnail_url {
            writeln!(out, r#"    <itunes:image href="{}"/>"#, escape(thumbnail))?;
        }

        for (position, item) in items.iter().enumerate() {
            write_item(out, &channel.title, item, position + 1)?;
        }

        writeln!(out, "  </channel>")?;
        writeln!(out, "</rss>")?;
        Ok(())
    }
}

fn write_item(out: &mut String, author: &str, item: &FeedItem, position: usize) -> std::fmt::Result {
    writeln!(out, "    <item>")?;
    writeln!(
        out,
        r#"      <guid isPermaLink="false">{}</guid>"#,
        escape(&item.video_id)
    )?;
    text_element(out, 6, "title", &item.title)?;
    text_element(out, 6, "link", &item.media_url)?;
    text_element(out, 6, "description", &item.description)?;
    text_element(out, 6, "pubDate", &format_rfc1123z(&item.published_at))?;
    writeln!(
        out,
        r#"      <enclosure url="{}" length="{}" type="{ENCLOSURE_TYPE}"/>"#,
        escape(&item.media_url),
        item.content_length
    )?;
    text_element(out, 6, "itunes:author", author)?;
    text_element(out, 6, "itunes:subtitle", truncate_chars(&item.title, SUBTITLE_MAX_CHARS))?;
    text_element(out, 6, "itunes:summary", &item.description)?;
    if let Some(thumbnail) = &item.thumbnail_url {
        writeln!(out, r#"      <itunes:image href="{}"/>"#, escape(thumbnail))?;
    }
    text_element(out, 6, "itunes:duration", &item.duration.as_secs().to_string())?;
    text_element(out, 6, "itunes:explicit", "no")?;
    text_element(out, 6, "itunes:order", &position.to_string())?;
    writeln!(out, "    </item>")
}

fn text_element(out: &mut String, indent: usize, name: &str, value: &str) -> std::fmt::Result {
    writeln!(out, "{:indent$}<{name}>{}</{name}>", "", escape(value))
}

fn escape(value: &str) -> Cow<'_, str> {
    if value.chars().all(is_xml_char) {
        return quick_xml::escape::escape(value);
    }
    let cleaned: String = value.chars().filter(|c| is_xml_char(*c)).collect();
    Cow::Owned(quick_xml::escape::escape(&cleaned).into_owned())
}

/// The `Char` production of XML 1.0
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}
