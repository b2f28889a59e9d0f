//! Message list (JSON) and message detail pages

use super::{ExtractContext, ReplyHeaderStyle};
use crate::error::{Error, Result};
use crate::markup::{linearize, required, required_in, selector, text_of};
use crate::person::{parse_profile_link, profile_link, resolve_person, split_person_list};
use crate::timestamp::parse_timestamp;
use crate::types::{
    Message, MessageId, MessageSummary, Person, PersonRole, ReplyMessage, Timestamp,
};
use scraper::{ElementRef, Html, Node, Selector};
use serde::Deserialize;
use std::sync::LazyLock;

const LIST_PAGE: &str = "message list";
const DETAIL_PAGE: &str = "message";

/// `Status` value of an unread message.
const STATUS_UNREAD: i64 = 1;

static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));
static TABLE_HEADERS: LazyLock<Selector> = LazyLock::new(|| selector("table th"));
static TABLE_CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static RECIPIENTS: LazyLock<Selector> = LazyLock::new(|| selector("#recipients-cell"));
static CONTENT: LazyLock<Selector> = LazyLock::new(|| selector(".ckeditor.hidden"));
static REPLY_BOX: LazyLock<Selector> = LazyLock::new(|| selector(".m-replybox"));
static REPLY_HEADER: LazyLock<Selector> = LazyLock::new(|| selector("h2"));
static REPLY_CONTENT: LazyLock<Selector> = LazyLock::new(|| selector(".inner"));

// ============================================
// List
// ============================================

/// One record of the `Messages` array.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawMessage {
    id: u64,
    subject: String,
    time_stamp: String,
    folder: String,
    sender: String,
    sender_id: u64,
    #[serde(default)]
    sender_type: Option<i64>,
    #[serde(default)]
    replies: u32,
    #[serde(default)]
    status: i64,
}

/// Summaries of the `{"Messages": [...]}` payload, in payload order.
pub fn extract_list(
    payload: &serde_json::Value,
    ctx: &ExtractContext<'_>,
) -> Result<Vec<MessageSummary>> {
    let records = payload
        .get("Messages")
        .and_then(|messages| messages.as_array())
        .ok_or_else(|| Error::structure(LIST_PAGE, "cannot find Messages array"))?;

    records
        .iter()
        .map(|record| {
            let raw = RawMessage::deserialize(record)
                .map_err(|e| Error::Parse(format!("invalid message record: {}", e)))?;
            summary_from_raw(raw, ctx)
        })
        .collect()
}

fn summary_from_raw(raw: RawMessage, ctx: &ExtractContext<'_>) -> Result<MessageSummary> {
    let last_activity = parse_timestamp(&raw.time_stamp, &ctx.zone)?;
    let summary = MessageSummary {
        id: MessageId(raw.id),
        origin: ctx.origin.to_string(),
        pupil_id: ctx.pupil_id.clone(),
        subject: raw.subject,
        last_activity,
        folder: raw.folder,
        sender: Person {
            name: raw.sender,
            id: Some(raw.sender_id),
            role: raw.sender_type.and_then(PersonRole::from_sender_type),
        },
        reply_count: raw.replies,
        is_unread: raw.status == STATUS_UNREAD,
    };
    tracing::trace!(id = %summary.id, unread = summary.is_unread, "Extracted message summary");
    Ok(summary)
}

// ============================================
// Detail
// ============================================

/// Complete `summary` from its detail page.
pub fn extract_detail(
    document: &Html,
    summary: MessageSummary,
    ctx: &ExtractContext<'_>,
    header_style: ReplyHeaderStyle,
) -> Result<Message> {
    let body = required(document, &BODY, DETAIL_PAGE, "body")?;

    let sent = sent_timestamp(body, ctx)?;
    let recipients = recipients(required_in(body, &RECIPIENTS, DETAIL_PAGE, "recipients")?)?;
    let content = linearize(required_in(body, &CONTENT, DETAIL_PAGE, "message body")?);
    let replies = body
        .select(&REPLY_BOX)
        .map(|reply_box| reply(reply_box, ctx, header_style))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        id = %summary.id,
        recipients = recipients.len(),
        replies = replies.len(),
        "Extracted message"
    );
    Ok(Message::from_summary(summary, sent, recipients, content, replies))
}

/// The `td` next to the one header cell reading `Sent: ...`.
fn sent_timestamp(body: ElementRef<'_>, ctx: &ExtractContext<'_>) -> Result<Timestamp> {
    let mut headers = body
        .select(&TABLE_HEADERS)
        .filter(|th| text_of(*th).trim_start().starts_with("Sent:"));
    let header = headers
        .next()
        .ok_or_else(|| Error::structure(DETAIL_PAGE, "cannot find Sent: header"))?;
    if headers.next().is_some() {
        return Err(Error::structure(DETAIL_PAGE, "more than one Sent: header"));
    }

    let cell = header
        .parent()
        .and_then(ElementRef::wrap)
        .and_then(|row| row.select(&TABLE_CELL).next())
        .ok_or_else(|| Error::structure(DETAIL_PAGE, "cannot find sent time cell"))?;
    parse_timestamp(&text_of(cell), &ctx.zone)
}

/// People in the recipients cell.
///
/// Elements resolve one person each (profile links keep id and role);
/// text runs are comma-split. The portal's lone `Hidden` placeholder
/// means the list is not shown, which yields no recipients.
fn recipients(cell: ElementRef<'_>) -> Result<Vec<Person>> {
    let mut people = Vec::new();
    for child in cell.children() {
        match child.value() {
            Node::Text(text) => people.extend(split_person_list(text)),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    let person = resolve_person(element, None)?;
                    if !person.name.is_empty() {
                        people.push(person);
                    }
                }
            }
            _ => {}
        }
    }

    if people.len() == 1 && people[0] == Person::hidden() {
        people.clear();
    }
    Ok(people)
}

fn reply(
    reply_box: ElementRef<'_>,
    ctx: &ExtractContext<'_>,
    header_style: ReplyHeaderStyle,
) -> Result<ReplyMessage> {
    let header_element = required_in(reply_box, &REPLY_HEADER, DETAIL_PAGE, "reply header")?;
    let content = required_in(reply_box, &REPLY_CONTENT, DETAIL_PAGE, "reply body")?;

    let header_text = text_of(header_element);
    let header = header_style
        .parse(&header_text)
        .ok_or_else(|| Error::Parse(format!("cannot parse reply header: {:?}", header_text.trim())))?;

    let sender = match profile_link(header_element) {
        Some(link) => parse_profile_link(link)?,
        None if header.from.eq_ignore_ascii_case("you") => Person::named(ctx.own_name),
        None => Person::named(header.from),
    };

    Ok(ReplyMessage {
        timestamp: parse_timestamp(&header.date, &ctx.zone)?,
        sender,
        body: linearize(content),
    })
}
