//! Request-side type definitions for Smart Redirect
//!
//! These types describe what the browser hands to the interceptor and
//! what the interceptor hands back.

// =============================================================================
// Request Types (bit mask for type filtering)
// =============================================================================

bitflags::bitflags! {
    /// Request type bit mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RequestType: u32 {
        const OTHER = 1 << 0;
        const SCRIPT = 1 << 1;
        const IMAGE = 1 << 2;
        const STYLESHEET = 1 << 3;
        const OBJECT = 1 << 4;
        const SUBDOCUMENT = 1 << 5;  // iframe/frame
        const MAIN_FRAME = 1 << 6;   // main document
        const XMLHTTPREQUEST = 1 << 7;
        const WEBSOCKET = 1 << 8;
        const FONT = 1 << 9;
        const MEDIA = 1 << 10;
        const PING = 1 << 11;
    }
}

impl RequestType {
    /// Parse from browser request type string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "main_frame" | "document" => Self::MAIN_FRAME,
            "sub_frame" | "subdocument" => Self::SUBDOCUMENT,
            "stylesheet" => Self::STYLESHEET,
            "script" => Self::SCRIPT,
            "image" => Self::IMAGE,
            "font" => Self::FONT,
            "object" => Self::OBJECT,
            "xmlhttprequest" => Self::XMLHTTPREQUEST,
            "ping" => Self::PING,
            "media" => Self::MEDIA,
            "websocket" => Self::WEBSOCKET,
            _ => Self::OTHER,
        }
    }

    /// Only top-level documents are ever considered for redirection.
    #[inline]
    pub fn is_top_level(&self) -> bool {
        self.contains(Self::MAIN_FRAME)
    }
}

// =============================================================================
// Navigation Request
// =============================================================================

/// A navigation the browser is about to perform.
#[derive(Debug, Clone, Copy)]
pub struct NavigationRequest<'a> {
    /// Full request URL
    pub url: &'a str,
    /// Request type
    pub request_type: RequestType,
}

impl<'a> NavigationRequest<'a> {
    /// A top-level document navigation.
    pub fn main_frame(url: &'a str) -> Self {
        Self {
            url,
            request_type: RequestType::MAIN_FRAME,
        }
    }
}

// =============================================================================
// Decision
// =============================================================================

/// Final decision for an intercepted navigation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Decision {
    /// Let the navigation load normally
    #[default]
    Allow,
    /// Load `url` instead of the requested page
    Redirect {
        url: String,
        /// Rule that fired (for logging)
        rule_id: String,
    },
}

impl Decision {
    /// Redirect target, if any.
    pub fn redirect_url(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Redirect { url, .. } => Some(url),
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_type_from_str() {
        assert_eq!(RequestType::from_str("main_frame"), RequestType::MAIN_FRAME);
        assert_eq!(RequestType::from_str("document"), RequestType::MAIN_FRAME);
        assert_eq!(RequestType::from_str("sub_frame"), RequestType::SUBDOCUMENT);
        assert_eq!(RequestType::from_str("image"), RequestType::IMAGE);
        assert_eq!(RequestType::from_str("beacon"), RequestType::OTHER);
    }

    #[test]
    fn test_only_main_frame_is_top_level() {
        assert!(RequestType::MAIN_FRAME.is_top_level());
        assert!(!RequestType::SUBDOCUMENT.is_top_level());
        assert!(!RequestType::SCRIPT.is_top_level());
    }

    #[test]
    fn test_decision_redirect_url() {
        assert_eq!(Decision::Allow.redirect_url(), None);
        let decision = Decision::Redirect {
            url: "https://new.com".to_string(),
            rule_id: "rule_1".to_string(),
        };
        assert_eq!(decision.redirect_url(), Some("https://new.com"));
        assert!(decision.is_redirect());
    }
}
