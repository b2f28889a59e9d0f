//! Front page: pupil roster, unread counts and the signed-in user's name

use crate::error::{Error, Result};
use crate::markup::{required, selector, text_of};
use crate::types::{FrontPage, Pupil, PupilId};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

const PAGE: &str = "front page";

/// Link suffix of the account settings page, whose label tells the UI language.
const SETTINGS_HREF_SUFFIX: &str = "passwd/settings";
const ENGLISH_SETTINGS_LABEL: &str = "Account settings";

/// `/!0123` or `/!0123/`
static PUPIL_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/!(\d+)/?$").expect("invalid regex: pupil href"));

/// `/!0123/messages`
static MESSAGES_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/!(\d+)/messages$").expect("invalid regex: messages href"));

static LINKS: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static OWN_NAME: LazyLock<Selector> = LazyLock::new(|| selector(".name-container .teacher"));

/// Extract everything the connection needs from the front page.
pub fn extract(document: &Html) -> Result<FrontPage> {
    let links: Vec<ElementRef<'_>> = document.select(&LINKS).collect();

    check_language(&links)?;

    let own_name = text_of(required(document, &OWN_NAME, PAGE, "own name")?)
        .trim()
        .to_string();

    let mut front = FrontPage {
        own_name,
        ..FrontPage::default()
    };
    for pupil in pupils(&links) {
        if front.pupil(&pupil.id).is_none() {
            front.pupils.push(pupil);
        }
    }
    // A later badge for the same pupil replaces an earlier one
    front.unread_counts.extend(unread_counts(&links));
    Ok(front)
}

/// The extractors read English labels; any other UI language is refused.
fn check_language(links: &[ElementRef<'_>]) -> Result<()> {
    let settings = links
        .iter()
        .find(|link| href(link).ends_with(SETTINGS_HREF_SUFFIX))
        .ok_or_else(|| Error::structure(PAGE, "cannot find account settings link"))?;

    let label = text_of(*settings);
    if label.trim() != ENGLISH_SETTINGS_LABEL {
        return Err(Error::structure(
            PAGE,
            format!(
                "unsupported UI language: settings link reads {:?}, expected {:?}",
                label.trim(),
                ENGLISH_SETTINGS_LABEL
            ),
        ));
    }
    Ok(())
}

/// Every `/!{id}` link is a pupil, in document order.
fn pupils(links: &[ElementRef<'_>]) -> Vec<Pupil> {
    links
        .iter()
        .filter_map(|link| {
            let caps = PUPIL_HREF.captures(href(link))?;
            Some(Pupil {
                id: PupilId::from(&caps[1]),
                name: text_of(*link).trim().to_string(),
            })
        })
        .collect()
}

/// Counts from the badges of `/!{id}/messages` links.
///
/// A link reading `"3 new messages"` counts 3; a link whose first word is
/// not all digits (`"Messages"`, `"+3 new"`) contributes nothing.
fn unread_counts(links: &[ElementRef<'_>]) -> Vec<(PupilId, u32)> {
    links
        .iter()
        .filter_map(|link| {
            let caps = MESSAGES_HREF.captures(href(link))?;
            let text = text_of(*link);
            let first = text.split_whitespace().next()?;
            if !first.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let count = first.parse::<u32>().ok()?;
            Some((PupilId::from(&caps[1]), count))
        })
        .collect()
}

fn href<'a>(link: &ElementRef<'a>) -> &'a str {
    link.value().attr("href").unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(settings_label: &str, body: &str) -> Html {
        Html::parse_document(&format!(
            r#"<html><body>
            <div class="name-container"><span class="teacher"> Parent Person </span></div>
            <a href="/passwd/settings">{}</a>
            {}
            </body></html>"#,
            settings_label, body
        ))
    }

    #[test]
    fn test_extract_roster_and_counts() {
        let html = page(
            "Account settings",
            r#"<a href="/!0111">Alice Example</a>
               <a href="/!0222/">Bob Example</a>
               <a href="/!0111/messages">2 new messages</a>
               <a href="/!0222/messages">Messages</a>
               <a href="/!0111/news">News</a>"#,
        );
        let front = extract(&html).unwrap();

        assert_eq!(front.own_name, "Parent Person");
        assert_eq!(front.pupils.len(), 2);
        assert_eq!(front.pupils[0].id, PupilId::from("0111"));
        assert_eq!(front.pupils[0].name, "Alice Example");
        assert_eq!(front.pupils[1].name, "Bob Example");
        assert_eq!(front.unread_counts.get(&PupilId::from("0111")), Some(&2));
        assert_eq!(front.unread_counts.get(&PupilId::from("0222")), None);
    }

    #[test]
    fn test_first_link_per_pupil_wins() {
        let html = page(
            "Account settings",
            r#"<a href="/!0111">Alice Example</a><a href="/!0111/">Home</a>"#,
        );
        let front = extract(&html).unwrap();
        assert_eq!(front.pupils.len(), 1);
        assert_eq!(front.pupils[0].name, "Alice Example");
        assert_eq!(extract(&html).unwrap(), front);
    }

    #[test]
    fn test_roster_keeps_page_order() {
        let html = page(
            "Account settings",
            r#"<a href="/!0999">Zoe Example</a><a href="/!0111">Alice Example</a>"#,
        );
        let names: Vec<String> = extract(&html)
            .unwrap()
            .pupils
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Zoe Example", "Alice Example"]);
    }

    #[test]
    fn test_last_badge_per_pupil_wins() {
        let html = page(
            "Account settings",
            r#"<a href="/!0111">Alice Example</a>
               <a href="/!0111/messages">2 new messages</a>
               <a href="/!0111/messages">5 new messages</a>"#,
        );
        let front = extract(&html).unwrap();
        assert_eq!(front.unread_counts.get(&PupilId::from("0111")), Some(&5));
    }

    #[test]
    fn test_signed_badge_is_not_a_count() {
        let html = page(
            "Account settings",
            r#"<a href="/!0111">Alice Example</a>
               <a href="/!0111/messages">+3 new messages</a>
               <a href="/!0222">Bob Example</a>
               <a href="/!0222/messages">-1 new</a>"#,
        );
        assert!(extract(&html).unwrap().unread_counts.is_empty());
    }

    #[test]
    fn test_no_pupils_is_empty_roster() {
        let front = extract(&page("Account settings", "")).unwrap();
        assert!(front.pupils.is_empty());
        assert!(front.unread_counts.is_empty());
    }

    #[test]
    fn test_non_english_ui_is_rejected() {
        let err = extract(&page("Käyttäjätilin asetukset", "")).unwrap_err();
        assert!(matches!(err, Error::Structure { .. }));
        assert!(err.to_string().contains("language"));
    }

    #[test]
    fn test_missing_own_name_is_structure_error() {
        let html = Html::parse_document(
            r#"<html><body><a href="/passwd/settings">Account settings</a></body></html>"#,
        );
        assert!(matches!(extract(&html), Err(Error::Structure { .. })));
    }
}
