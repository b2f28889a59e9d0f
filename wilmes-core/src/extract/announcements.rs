//! Announcement ("news") list and detail pages

use super::ExtractContext;
use crate::error::{Error, Result};
use crate::markup::{linearize, required, required_in, selector, text_excluding, text_of};
use crate::person::resolve_announcement_sender;
use crate::timestamp::parse_timestamp;
use crate::types::{Announcement, AnnouncementId, AnnouncementSummary, Timestamp};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;

const LIST_PAGE: &str = "announcement list";
const DETAIL_PAGE: &str = "announcement";

/// Title label marking an announcement the user has not opened.
const UNREAD_LABEL: &str = "new";

/// `/!0123/news/456`
static NEWS_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/!(\d+)/news/(\d+)$").expect("invalid regex: news href"));

static LINKS: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static HEADINGS_AND_CARDS: LazyLock<Selector> = LazyLock::new(|| selector("h2, .well"));
static CARD_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("h3"));
static LABEL: LazyLock<Selector> = LazyLock::new(|| selector("span.label"));
static PANEL: LazyLock<Selector> = LazyLock::new(|| selector(".panel-body"));
static CONTENT: LazyLock<Selector> = LazyLock::new(|| selector("#news-content"));
static METADATA: LazyLock<Selector> = LazyLock::new(|| selector(".horizontal-link-container"));
static DATE: LazyLock<Selector> = LazyLock::new(|| selector("span.small"));

// ============================================
// List
// ============================================

/// What the listing tells about one announcement.
#[derive(Debug, Default)]
struct ListedItem {
    subject: String,
    timestamp: Option<Timestamp>,
    is_unread: bool,
}

/// Summaries from the announcement listing, sorted by id.
///
/// Plain styled links contribute id and subject. Cards (`.well`) add the
/// date of the `h2` heading above them and the title labels; a card's data
/// replaces whatever a link said about the same id.
pub fn extract_list(
    document: &Html,
    ctx: &ExtractContext<'_>,
) -> Result<Vec<AnnouncementSummary>> {
    let mut items: BTreeMap<u64, ListedItem> = BTreeMap::new();

    for link in document.select(&LINKS) {
        if link.value().classes().next().is_none() {
            continue;
        }
        if let Some(id) = news_id(link, ctx) {
            items.insert(
                id,
                ListedItem {
                    subject: text_of(link).trim().to_string(),
                    ..ListedItem::default()
                },
            );
        }
    }

    let mut heading: Option<ElementRef<'_>> = None;
    for element in document.select(&HEADINGS_AND_CARDS) {
        if element.value().name() == "h2" {
            heading = Some(element);
            continue;
        }
        let Some((id, item)) = card(element, heading, ctx)? else {
            continue;
        };
        items.insert(id, item);
    }

    let summaries: Vec<AnnouncementSummary> = items
        .into_iter()
        .map(|(id, item)| AnnouncementSummary {
            id: AnnouncementId(id),
            origin: ctx.origin.to_string(),
            pupil_id: ctx.pupil_id.clone(),
            subject: item.subject,
            timestamp: item.timestamp,
            is_unread: item.is_unread,
        })
        .collect();

    tracing::debug!(
        pupil = %ctx.pupil_id,
        count = summaries.len(),
        "Extracted announcement list"
    );
    Ok(summaries)
}

/// Id of a link to one of this pupil's announcements.
fn news_id(link: ElementRef<'_>, ctx: &ExtractContext<'_>) -> Option<u64> {
    let href = link.value().attr("href")?;
    let caps = NEWS_HREF.captures(href)?;
    if &caps[1] != ctx.pupil_id.as_str() {
        return None;
    }
    caps[2].parse().ok()
}

/// A card with a title and a news link; `None` for other `.well` boxes.
fn card(
    well: ElementRef<'_>,
    heading: Option<ElementRef<'_>>,
    ctx: &ExtractContext<'_>,
) -> Result<Option<(u64, ListedItem)>> {
    let Some(title) = well.select(&CARD_TITLE).next() else {
        return Ok(None);
    };
    let Some(id) = well.select(&LINKS).find_map(|link| news_id(link, ctx)) else {
        return Ok(None);
    };

    let timestamp = heading
        .map(|h2| parse_timestamp(text_of(h2).trim(), &ctx.zone))
        .transpose()?;
    let (subject, labels) = title_and_labels(title);

    Ok(Some((
        id,
        ListedItem {
            subject,
            timestamp,
            is_unread: labels.iter().any(|label| label == UNREAD_LABEL),
        },
    )))
}

/// Card title without its labels, plus the lowercased label texts.
///
/// `<h3>Trip <span class="label">New</span></h3>` → `("Trip", ["new"])`.
fn title_and_labels(title: ElementRef<'_>) -> (String, Vec<String>) {
    let labels = title
        .select(&LABEL)
        .map(|label| text_of(label).trim().to_lowercase())
        .collect();
    let subject = text_excluding(title, &LABEL).trim().to_string();
    (subject, labels)
}

// ============================================
// Detail
// ============================================

/// Complete `summary` from its detail page.
pub fn extract_detail(
    document: &Html,
    summary: AnnouncementSummary,
    ctx: &ExtractContext<'_>,
) -> Result<Announcement> {
    let panel = required(document, &PANEL, DETAIL_PAGE, "panel body")?;
    let content = required_in(panel, &CONTENT, DETAIL_PAGE, "news content")?;
    let metadata = required_in(panel, &METADATA, DETAIL_PAGE, "metadata")?;
    let date = required_in(metadata, &DATE, DETAIL_PAGE, "publication date")?;

    let date_text = text_of(date);
    let last_token = date_text.split_whitespace().last().ok_or_else(|| {
        Error::structure(DETAIL_PAGE, "publication date is empty")
    })?;
    let timestamp = parse_timestamp(last_token, &ctx.zone)?;
    let sender = resolve_announcement_sender(metadata, Some(&DATE))?;

    tracing::debug!(id = %summary.id, sender = %sender, "Extracted announcement");
    Ok(Announcement::from_summary(
        summary,
        timestamp,
        sender,
        linearize(content),
    ))
}
