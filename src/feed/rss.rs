use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use super::entries::{feed_entries, FeedEntry};
use crate::events::ConcertMap;

/// Channel-level metadata of the generated feed.
#[derive(Debug, Clone)]
pub struct FeedChannel {
    pub title: String,
    /// Site link; also used for items without a ticket URL.
    pub link: String,
    pub description: String,
}

/// Builds the complete RSS document for a run.
///
/// Always produces a valid channel, with zero items when no artist has events.
pub fn generate_feed(
    concerts: &ConcertMap,
    channel: &FeedChannel,
    now: DateTime<Utc>,
) -> Result<String> {
    let entries = feed_entries(concerts, &channel.link, now);
    tracing::debug!(items = entries.len(), "Rendering feed");
    render_rss(channel, &entries, now)
}

/// Serializes a channel and its entries as an RSS 2.0 XML string.
pub fn render_rss(channel: &FeedChannel, entries: &[FeedEntry], now: DateTime<Utc>) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    writer
        .write_event(Event::Start(rss))
        .context("Failed to write rss element")?;
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .context("Failed to write channel element")?;

    write_text_element(&mut writer, "title", &channel.title)?;
    write_text_element(&mut writer, "link", &channel.link)?;
    write_text_element(&mut writer, "description", &channel.description)?;
    write_text_element(&mut writer, "lastBuildDate", &now.to_rfc2822())?;
    write_text_element(&mut writer, "generator", "tourwatch")?;

    for entry in entries {
        write_item(&mut writer, entry)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .context("Failed to write channel end")?;
    writer
        .write_event(Event::End(BytesEnd::new("rss")))
        .context("Failed to write rss end")?;

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).context("Generated feed contains invalid UTF-8")
}

fn write_item(writer: &mut Writer<Cursor<Vec<u8>>>, entry: &FeedEntry) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("item")))
        .context("Failed to write item element")?;

    write_text_element(writer, "title", &entry.title)?;
    write_text_element(writer, "link", &entry.link)?;
    write_text_element(writer, "description", &entry.description)?;

    let mut guid = BytesStart::new("guid");
    guid.push_attribute((
        "isPermaLink",
        if entry.guid_is_permalink { "true" } else { "false" },
    ));
    writer
        .write_event(Event::Start(guid))
        .context("Failed to write guid element")?;
    writer
        .write_event(Event::Text(BytesText::new(&entry.guid)))
        .context("Failed to write guid text")?;
    writer
        .write_event(Event::End(BytesEnd::new("guid")))
        .context("Failed to write guid end")?;

    write_text_element(writer, "pubDate", &entry.published.to_rfc2822())?;

    writer
        .write_event(Event::End(BytesEnd::new("item")))
        .context("Failed to write item end")?;
    Ok(())
}

fn write_text_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Failed to write {name} element"))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .with_context(|| format!("Failed to write {name} text"))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Failed to write {name} end"))?;
    Ok(())
}
