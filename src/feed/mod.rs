//! Feed identities, fetching, and CSV parsing.
//!
//! Every run ingests the same seven feeds, one per spreadsheet tab. This
//! module names them and owns the two stages that do not depend on a feed's
//! meaning:
//!
//! - [`fetcher`] - HTTP retrieval of raw CSV bytes with a timeout and size cap
//! - [`parser`] - RFC 4180 decoding into header-keyed [`RawRow`]s
//!
//! Which shape a feed's rows take is decided by [`FeedKind::schema`], a
//! static table over the closed set of feeds. Nothing downstream inspects
//! cell contents to guess a schema.

mod fetcher;
mod parser;

pub use fetcher::{build_client, fetch, fetch_all, FetchError, FetchErrorKind, FetchLimits};
pub use parser::{parse_csv, ParseError, ParseErrorReason, ParsedFeed, RawRow};

use std::fmt;

/// One of the seven spreadsheet tabs a run ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeedKind {
    General,
    Hero,
    About,
    Values,
    Services,
    ServiceDetails,
    Contact,
}

impl FeedKind {
    /// All feeds in canonical order. Logging and error selection follow it.
    pub const ALL: [FeedKind; 7] = [
        FeedKind::General,
        FeedKind::Hero,
        FeedKind::About,
        FeedKind::Values,
        FeedKind::Services,
        FeedKind::ServiceDetails,
        FeedKind::Contact,
    ];

    /// Configuration key for this feed.
    pub fn name(self) -> &'static str {
        match self {
            FeedKind::General => "general",
            FeedKind::Hero => "hero",
            FeedKind::About => "about",
            FeedKind::Values => "values",
            FeedKind::Services => "services",
            FeedKind::ServiceDetails => "service_details",
            FeedKind::Contact => "contact",
        }
    }

    /// The row shape this feed's CSV must follow.
    pub fn schema(self) -> SchemaKind {
        match self {
            FeedKind::General | FeedKind::Hero | FeedKind::About | FeedKind::Contact => {
                SchemaKind::KeyValue
            }
            FeedKind::Values => SchemaKind::Tabular {
                columns: CORE_VALUE_COLUMNS,
            },
            FeedKind::Services => SchemaKind::Tabular {
                columns: SERVICE_COLUMNS,
            },
            FeedKind::ServiceDetails => SchemaKind::Tabular {
                columns: SERVICE_DETAIL_COLUMNS,
            },
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Header of every key-value feed.
pub const KEY_VALUE_COLUMNS: &[&str] = &["field", "value"];
pub const CORE_VALUE_COLUMNS: &[&str] = &["icon", "title", "description", "gradient"];
pub const SERVICE_COLUMNS: &[&str] = &["name", "link_id", "gradient"];
pub const SERVICE_DETAIL_COLUMNS: &[&str] = &[
    "service_id",
    "title",
    "intro",
    "bullets_title",
    "key_services",
    "closing",
    "bg_image",
    "image_position",
];

/// Row shape of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// Two columns, `field` and `value`, folded into one flat record.
    KeyValue,
    /// One entity per row over a closed column set.
    Tabular { columns: &'static [&'static str] },
}

impl SchemaKind {
    /// Columns the header must contain, no more and no fewer.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            SchemaKind::KeyValue => KEY_VALUE_COLUMNS,
            SchemaKind::Tabular { columns } => columns,
        }
    }
}

/// Where one feed is published. Immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub kind: FeedKind,
    pub url: String,
}
