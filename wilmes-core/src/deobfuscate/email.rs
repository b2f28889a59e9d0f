//! Email address de-obfuscation
//!
//! Protected addresses are a hex string whose first byte is an XOR key for
//! every following byte:
//!
//! ```
//! use wilmes_core::deobfuscate::email;
//!
//! let address = email::decode("88dcedfbfca6cde5e9e1e4c8edf0e9e5f8e4eda6ebe7e5").unwrap();
//! assert_eq!(address, "Test.Email@example.com");
//! ```

use crate::error::{Error, Result};
use scraper::node::Element;

/// Path prefix of protected `mailto` links; the payload follows the `#`.
pub const PROTECTED_LINK_PATH: &str = "/cdn-cgi/l/email-protection#";

/// Class of inline elements that stand in for an address.
pub const PROTECTED_CLASS: &str = "__cf_email__";

/// Attribute holding the payload of an inline placeholder.
pub const PAYLOAD_ATTR: &str = "data-cfemail";

/// Decode a protected address payload.
pub fn decode(payload: &str) -> Result<String> {
    let bytes = hex::decode(payload.trim())
        .map_err(|e| Error::Parse(format!("invalid email payload {:?}: {}", payload, e)))?;
    let (key, rest) = bytes
        .split_first()
        .ok_or_else(|| Error::Parse("empty email payload".to_string()))?;
    let plain: Vec<u8> = rest.iter().map(|b| b ^ key).collect();
    String::from_utf8(plain)
        .map_err(|e| Error::Parse(format!("email payload is not UTF-8: {}", e)))
}

/// Encode an address the way the portal does, with the given key.
pub fn obfuscate(address: &str, key: u8) -> String {
    let mut bytes = Vec::with_capacity(address.len() + 1);
    bytes.push(key);
    bytes.extend(address.bytes().map(|b| b ^ key));
    hex::encode(bytes)
}

/// Rewrite a protected link target to a `mailto:` URL.
///
/// `"/cdn-cgi/l/email-protection#88dc…"` → `Some("mailto:Test.Email@example.com")`.
/// Returns `None` for ordinary links and for payloads that do not decode.
pub fn rewrite_href(href: &str) -> Option<String> {
    let (_, payload) = href.split_once(PROTECTED_LINK_PATH)?;
    if payload.is_empty() {
        return None;
    }
    match decode(payload) {
        Ok(address) => Some(format!("mailto:{}", address)),
        Err(e) => {
            tracing::warn!(href, error = %e, "Leaving undecodable email link as-is");
            None
        }
    }
}

/// The address an inline placeholder element stands for, if it is one.
pub fn inline_address(element: &Element) -> Option<String> {
    if !element.classes().any(|class| class == PROTECTED_CLASS) {
        return None;
    }
    let payload = element.attr(PAYLOAD_ATTR)?;
    match decode(payload) {
        Ok(address) => Some(address),
        Err(e) => {
            tracing::warn!(payload, error = %e, "Leaving undecodable email placeholder as-is");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    const PAYLOAD: &str = "88dcedfbfca6cde5e9e1e4c8edf0e9e5f8e4eda6ebe7e5";

    #[test]
    fn test_decode_known_payload() {
        assert_eq!(decode(PAYLOAD).unwrap(), "Test.Email@example.com");
    }

    #[test]
    fn test_round_trip_every_key() {
        let addresses = ["a@b.c", "Test.Email@example.com", "x_y+z@sub.example.org", ""];
        for key in 0..=255u8 {
            for address in addresses {
                assert_eq!(decode(&obfuscate(address, key)).unwrap(), address);
            }
        }
    }

    #[test]
    fn test_decode_rejects_bad_payloads() {
        assert!(matches!(decode(""), Err(Error::Parse(_))));
        assert!(matches!(decode("zz"), Err(Error::Parse(_))));
        assert!(matches!(decode("abc"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_rewrite_href() {
        let href = format!("/cdn-cgi/l/email-protection#{}", PAYLOAD);
        assert_eq!(
            rewrite_href(&href).as_deref(),
            Some("mailto:Test.Email@example.com")
        );
        assert_eq!(rewrite_href("/some-uri"), None);
        assert_eq!(rewrite_href("/cdn-cgi/l/email-protection"), None);
        assert_eq!(rewrite_href("/cdn-cgi/l/email-protection#nothex"), None);
    }

    #[test]
    fn test_inline_address() {
        let html = Html::parse_fragment(&format!(
            r#"<a href="/cdn-cgi/l/email-protection" class="__cf_email__" data-cfemail="{}">[email protected]</a><span class="other" data-cfemail="{}">x</span>"#,
            PAYLOAD, PAYLOAD
        ));
        let selector = Selector::parse("[data-cfemail]").unwrap();
        let found: Vec<_> = html
            .select(&selector)
            .map(|el| inline_address(el.value()))
            .collect();
        assert_eq!(
            found,
            vec![Some("Test.Email@example.com".to_string()), None]
        );
    }
}
