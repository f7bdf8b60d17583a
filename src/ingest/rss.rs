// src/ingest/rss.rs
use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::normalize_text;
use crate::ingest::types::{FeedClient, RawFeedItem};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    guid: Option<Guid>,
}

// `<guid isPermaLink="false">…</guid>` carries an attribute, so read the text node explicitly.
#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text", default)]
    value: String,
}

/// Parse an RSS `pubDate`. Feeds mostly use RFC 2822; a few emit RFC 3339.
pub fn parse_pub_date(ts: &str) -> Option<OffsetDateTime> {
    let ts = ts.trim();
    OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .ok()
}

/// Parse an RSS 2.0 document into raw items. Empty strings are treated as missing.
pub fn parse_rss(xml: &str) -> Result<Vec<RawFeedItem>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

    let out = rss
        .channel
        .item
        .into_iter()
        .map(|it| RawFeedItem {
            title: non_empty(it.title.as_deref().map(normalize_text)),
            link: non_empty(it.link.map(|l| l.trim().to_string())),
            pub_date: non_empty(it.pub_date),
            content_snippet: non_empty(it.description.as_deref().map(normalize_text)),
            guid: non_empty(it.guid.map(|g| g.value.trim().to_string())),
        })
        .collect::<Vec<_>>();

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("haiku_feed_parse_ms").record(ms);
    Ok(out)
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

/// RSS over HTTP, or canned XML keyed by URL for tests and offline runs.
pub struct RssFeedClient {
    mode: Mode,
}

enum Mode {
    Fixture(HashMap<String, String>),
    Http(reqwest::Client),
}

impl RssFeedClient {
    pub fn http() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("haiku-news/0.1 (+rss reader)")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .context("building rss http client")?;
        Ok(Self {
            mode: Mode::Http(client),
        })
    }

    /// Serve fixed documents; unknown URLs fail like an unreachable feed would.
    pub fn from_fixtures<I, K, V>(docs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            mode: Mode::Fixture(
                docs.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl FeedClient for RssFeedClient {
    async fn fetch(&self, url: &str) -> Result<Vec<RawFeedItem>> {
        match &self.mode {
            Mode::Fixture(docs) => {
                let xml = docs
                    .get(url)
                    .ok_or_else(|| anyhow!("no fixture for {url}"))?;
                parse_rss(xml)
            }
            Mode::Http(client) => {
                let resp = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("rss http get {url}"))?
                    .error_for_status()
                    .with_context(|| format!("rss http status {url}"))?;
                let body = resp.text().await.context("rss http .text()")?;
                parse_rss(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        match self.mode {
            Mode::Fixture(_) => "fixture",
            Mode::Http(_) => "http",
        }
    }
}
