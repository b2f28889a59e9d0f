//! Extractors for the supported portal versions

use super::{MarkupVariant, PortalExtractor, ReplyHeaderStyle};

/// Markup of the current portal release.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentPortal;

impl PortalExtractor for CurrentPortal {
    fn variant(&self) -> MarkupVariant {
        MarkupVariant::Current
    }

    fn reply_header_style(&self) -> ReplyHeaderStyle {
        ReplyHeaderStyle::FreeForm
    }
}

/// Markup of the older portal release.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassicPortal;

impl PortalExtractor for ClassicPortal {
    fn variant(&self) -> MarkupVariant {
        MarkupVariant::Classic
    }

    fn reply_header_style(&self) -> ReplyHeaderStyle {
        ReplyHeaderStyle::Parenthesized
    }
}

/// Extractor for a markup variant.
pub fn extractor_for(variant: MarkupVariant) -> Box<dyn PortalExtractor> {
    match variant {
        MarkupVariant::Current => Box::new(CurrentPortal),
        MarkupVariant::Classic => Box::new(ClassicPortal),
    }
}
