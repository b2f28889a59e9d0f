//! Emoji sprites back to characters
//!
//! The portal's editor stores emoji as images such as
//! `/smiley/images/wink_smile.png`; the file stem names the glyph.

use regex::Regex;
use scraper::node::Element;
use std::sync::LazyLock;

static SMILEY_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*/smiley/images/([^/]*)\.png").expect("invalid regex: smiley src")
});

/// Sprite name to glyph, as offered by the portal's editor.
const EMOJI: &[(&str, &str)] = &[
    ("regular_smile", "🙂"),
    ("sad_smile", "🙁"),
    ("wink_smile", "😉"),
    ("teeth_smile", "😀"),
    ("confused_smile", "😕"),
    ("tongue_smile", "😛"),
    ("embarrassed_smile", "😳"),
    ("omg_smile", "😯"),
    ("whatchutalkingabout_smile", "😐"),
    ("angry_smile", "😡"),
    ("angel_smile", "😇"),
    ("shades_smile", "😎"),
    ("devil_smile", "😈"),
    ("cry_smile", "😢"),
    ("lightbulb", "💡"),
    ("thumbs_down", "👎"),
    ("thumbs_up", "👍"),
    ("heart", "❤️"),
    ("broken_heart", "💔"),
    ("kiss", "💋"),
    ("envelope", "✉️"),
    ("alien", "👽"),
    ("blink", "🤪"),
    ("cheerful", "😃"),
    ("dizzy", "🥴"),
    ("ermm", "🙄"),
    ("getlost", "😒"),
    ("ninja", "🥷"),
    ("pinch", "😣"),
    ("sick", "🤢"),
    ("sideways", "😏"),
    ("silly", "🙃"),
    ("sleeping", "😴"),
    ("unsure", "🤔"),
    ("wassat", "🤨"),
    ("whistling", "😗🎵"),
    ("w00t", "😲"),
];

/// Glyph for a sprite name.
pub fn glyph(name: &str) -> Option<&'static str> {
    EMOJI
        .iter()
        .find(|(sprite, _)| *sprite == name)
        .map(|(_, glyph)| *glyph)
}

/// Sprite name from an image source.
///
/// `"https://x/ckeditor/plugins/smiley/images/heart.png"` → `Some("heart")`.
pub fn sprite_name(src: &str) -> Option<&str> {
    SMILEY_SRC
        .captures(src)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Glyph for an `<img>` element, or `None` when it is not a known sprite.
pub fn glyph_for_img(element: &Element) -> Option<&'static str> {
    if element.name() != "img" {
        return None;
    }
    element.attr("src").and_then(sprite_name).and_then(glyph)
}
