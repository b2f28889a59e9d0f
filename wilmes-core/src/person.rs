//! Person resolution
//!
//! People appear in three shapes on the portal:
//!
//! - a profile link, `<a class="profile-link" href="/profiles/teachers/42">Jane Doe (JD)</a>`,
//!   carrying a role tag and a numeric id;
//! - plain text, of which the first non-empty line is the name;
//! - a comma-separated recipient run, `Jane Doe (Math, Grade 9), John Roe`.
//!
//! Announcement pages print `Name (Role)` where other pages print
//! `Role (Name)`; [`swap_parenthesized`] canonicalizes the former.

use crate::error::{Error, Result};
use crate::markup::{self, selector};
use crate::types::{Person, PersonRole};
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

/// `.../profiles/{role}/{id}`, matched from the start of the href.
static PROFILE_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*/profiles/([^/]+)/(\d+)").expect("invalid regex: profile href")
});

/// `A (B)` with the parenthetical at the very end.
static TRAILING_PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*) \((.*)\)$").expect("invalid regex: trailing parenthetical")
});

static PROFILE_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.profile-link"));

/// Resolve the person an element names.
///
/// A profile link (the element itself or the first one inside it) wins;
/// otherwise the first non-empty line of the element's text is the name.
/// Sub-elements matching `excluded` do not count towards that text.
pub fn resolve_person(element: ElementRef<'_>, excluded: Option<&Selector>) -> Result<Person> {
    if let Some(link) = profile_link(element) {
        return parse_profile_link(link);
    }
    let text = match excluded {
        Some(excluded) => markup::text_excluding(element, excluded),
        None => markup::text_of(element),
    };
    Ok(Person::named(first_line(&text)))
}

/// Announcement senders: [`resolve_person`] plus [`swap_parenthesized`].
pub fn resolve_announcement_sender(
    element: ElementRef<'_>,
    excluded: Option<&Selector>,
) -> Result<Person> {
    let mut person = resolve_person(element, excluded)?;
    person.name = swap_parenthesized(&person.name);
    Ok(person)
}

/// The element itself when it is a profile link, else the first one inside.
pub fn profile_link(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if PROFILE_LINK.matches(&element) {
        Some(element)
    } else {
        element.select(&PROFILE_LINK).next()
    }
}

/// Person from a profile link: name from the link text, role and id from
/// the href.
///
/// `href="/!0123/profiles/teachers/42"` → role `teachers`, id `42`.
pub fn parse_profile_link(link: ElementRef<'_>) -> Result<Person> {
    let href = link.value().attr("href").unwrap_or_default();
    let caps = PROFILE_HREF
        .captures(href)
        .ok_or_else(|| Error::Parse(format!("cannot parse profile link: {:?}", href)))?;
    let id = caps[2]
        .parse::<u64>()
        .map_err(|e| Error::Parse(format!("invalid profile id in {:?}: {}", href, e)))?;
    Ok(Person {
        name: markup::text_of(link).trim().to_string(),
        id: Some(id),
        role: Some(PersonRole::from(&caps[1])),
    })
}

/// `"Jane Doe (Teacher)"` → `"Teacher (Jane Doe)"`; other shapes unchanged.
pub fn swap_parenthesized(name: &str) -> String {
    match TRAILING_PARENTHETICAL.captures(name) {
        Some(caps) => format!("{} ({})", &caps[2], &caps[1]),
        None => name.to_string(),
    }
}

/// Split a plain-text recipient run on commas outside parentheses.
///
/// `"Jane Doe (Math, Grade 9), John Roe,"` → `["Jane Doe (Math, Grade 9)", "John Roe"]`.
pub fn split_person_list(text: &str) -> Vec<Person> {
    let mut people = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                push_name(&mut people, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push_name(&mut people, &current);
    people
}

fn push_name(people: &mut Vec<Person>, raw: &str) {
    let name = raw.trim();
    if !name.is_empty() {
        people.push(Person::named(name));
    }
}

fn first_line(text: &str) -> &str {
    text.trim().lines().next().unwrap_or_default().trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn root(html: &Html) -> ElementRef<'_> {
        html.select(&selector("#x")).next().unwrap()
    }

    #[test]
    fn test_profile_link_itself() {
        let html = Html::parse_fragment(
            r#"<a id="x" class="profile-link" href="/!0123/profiles/teachers/42">Jane Doe (JD)</a>"#,
        );
        let person = resolve_person(root(&html), None).unwrap();
        assert_eq!(
            person,
            Person {
                name: "Jane Doe (JD)".to_string(),
                id: Some(42),
                role: Some(PersonRole::Teachers),
            }
        );
    }

    #[test]
    fn test_profile_link_inside_container() {
        let html = Html::parse_fragment(
            r#"<div id="x">From <a class="profile-link" href="https://p.example/profiles/personnel/7">Office</a></div>"#,
        );
        let person = resolve_person(root(&html), None).unwrap();
        assert_eq!(person.id, Some(7));
        assert_eq!(person.role, Some(PersonRole::Personnel));
    }

    #[test]
    fn test_bad_profile_href_is_parse_error() {
        let html = Html::parse_fragment(
            r#"<a id="x" class="profile-link" href="/profiles/teachers/abc">Jane</a>"#,
        );
        assert!(matches!(
            resolve_person(root(&html), None),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_plain_text_takes_first_line() {
        let html = Html::parse_fragment("<div id=\"x\">\n   \n  Jane Doe  \n  Principal\n</div>");
        let person = resolve_person(root(&html), None).unwrap();
        assert_eq!(person, Person::named("Jane Doe"));
    }

    #[test]
    fn test_announcement_sender_is_swapped() {
        let html = Html::parse_fragment(
            r#"<div id="x">Jane Doe (Teacher)<span class="small">Published 1.2.2021</span></div>"#,
        );
        let excluded = selector("span.small");
        let announcement = resolve_announcement_sender(root(&html), Some(&excluded)).unwrap();
        assert_eq!(announcement.name, "Teacher (Jane Doe)");

        let message = resolve_person(root(&html), Some(&excluded)).unwrap();
        assert_eq!(message.name, "Jane Doe (Teacher)");
    }

    #[test]
    fn test_swap_parenthesized() {
        assert_eq!(swap_parenthesized("Jane Doe (Teacher)"), "Teacher (Jane Doe)");
        assert_eq!(swap_parenthesized("Jane Doe"), "Jane Doe");
        assert_eq!(swap_parenthesized("(Teacher)"), "(Teacher)");
    }

    #[test]
    fn test_split_respects_parentheses() {
        let people = split_person_list("Jane Doe (Math, Grade 9), John Roe");
        assert_eq!(
            people,
            vec![
                Person::named("Jane Doe (Math, Grade 9)"),
                Person::named("John Roe")
            ]
        );
    }

    #[test]
    fn test_split_trailing_comma_and_blanks() {
        assert_eq!(
            split_person_list(" A, , B (x),"),
            vec![Person::named("A"), Person::named("B (x)")]
        );
        assert!(split_person_list("  ").is_empty());
    }
}
