//! Smart Redirect Core Library
//!
//! This crate holds everything the Smart Redirect extension does besides
//! drawing pages: the rule model, the hostname matcher, the persisted rule
//! store, the background interceptor and the editing surfaces used by the
//! options page and the popup.
//!
//! # Architecture
//!
//! The store is the single source of truth. The options page
//! ([`RuleEditor`]) and the popup ([`StatusPanel`]) write to it and then
//! send an `updateRules` message; the [`Background`] reloads its
//! interceptor cache from the store when that message or a store change
//! notification arrives. Navigation decisions are synchronous and only
//! ever read the cache.
//!
//! # Modules
//!
//! - `rule`: Rule model, match types, id generation
//! - `url`: Host extraction, URL validation, source normalization
//! - `matcher`: First-match-wins rule lookup
//! - `store`: Store trait plus in-memory and JSON file implementations
//! - `interceptor`: Cached rules and the navigation decision
//! - `background`: Interceptor wiring to messages and store changes
//! - `message`: Inter-context messages and notifiers
//! - `draft`: Form input validation
//! - `editor`: Options page CRUD, import and export
//! - `exchange`: Export/import file format
//! - `status`: Popup summary and shortcuts
//! - `types`: Request-side shared types

pub mod background;
pub mod draft;
pub mod editor;
pub mod error;
pub mod exchange;
pub mod interceptor;
pub mod matcher;
pub mod message;
pub mod rule;
pub mod status;
pub mod store;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use background::Background;
pub use draft::RuleDraft;
pub use editor::{Confirm, Question, RuleEditor};
pub use error::{EditorError, NotifyError, ParseError, StorageError, ValidationError};
pub use exchange::{ExportDocument, ImportPolicy};
pub use interceptor::{InterceptorState, RedirectInterceptor};
pub use matcher::find_matching_rule;
pub use message::{Message, Messenger, Notifier, Response};
pub use rule::{MatchType, Rule};
pub use status::{SiteStatus, StatusPanel, StatusSummary};
#[cfg(feature = "fs")]
pub use store::FileStore;
pub use store::{MemoryStore, RuleStore, StoreChange, StoreSnapshot};
pub use types::{Decision, NavigationRequest, RequestType};
pub use url::clean_source;
