use super::{check_columns, or_default, required, Adapted, SchemaError};
use crate::feed::{FeedKind, ParsedFeed};
use serde::Serialize;

const DEFAULT_ICON: &str = "🎯";
const DEFAULT_GRADIENT: &str = "from-blue-500 to-cyan-500";
const DEFAULT_BULLETS_TITLE: &str = "Key Services Include:";

/// Separator between items inside a `key_services` cell.
pub const KEY_SERVICES_DELIMITER: char = '|';

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoreValue {
    pub icon: String,
    pub title: String,
    pub description: String,
    pub gradient: String,
}

/// One row of the Services tab. `link_id` is the join key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSummary {
    pub name: String,
    pub link_id: String,
    pub gradient: String,
}

/// One row of the ServiceDetails tab, keyed by `service_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDetail {
    pub service_id: String,
    pub title: String,
    pub intro: String,
    pub bullets_title: String,
    pub key_services: Vec<String>,
    pub closing: String,
    pub bg_image: String,
    pub image_position: ImagePosition,
}

/// Side of a service section the background image sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePosition {
    Left,
    Right,
}

impl ImagePosition {
    /// Case-insensitive match on `left` / `right`, ignoring surrounding
    /// whitespace. There is no fallback value.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("left") {
            Some(ImagePosition::Left)
        } else if value.eq_ignore_ascii_case("right") {
            Some(ImagePosition::Right)
        } else {
            None
        }
    }
}

/// Splits a `key_services` cell on `|`.
///
/// Segments are trimmed, empty ones dropped, order kept:
/// `"A | B | C"` gives `["A", "B", "C"]` and `"A||B"` gives `["A", "B"]`.
pub fn parse_key_services(cell: &str) -> Vec<String> {
    cell.split(KEY_SERVICES_DELIMITER)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// `[a-z0-9]+(-[a-z0-9]+)*`
fn is_link_token(value: &str) -> bool {
    !value.is_empty()
        && value.split('-').all(|part| {
            !part.is_empty()
                && part
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        })
}

/// Maps core value rows, filling a blank icon or gradient with the default.
///
/// # Errors
///
/// - [`SchemaError::Columns`] - header differs from `icon,title,description,gradient`
/// - [`SchemaError::MissingField`] - a row has no `title`
pub fn adapt_core_values(feed: &ParsedFeed) -> Result<Adapted<Vec<CoreValue>>, SchemaError> {
    debug_assert_eq!(feed.kind, FeedKind::Values);
    check_columns(feed)?;

    let values = feed
        .rows
        .iter()
        .map(|row| {
            Ok(CoreValue {
                icon: or_default(row, "icon", DEFAULT_ICON),
                title: required(feed.kind, row, "title")?.to_string(),
                description: super::cell(row, "description").to_string(),
                gradient: or_default(row, "gradient", DEFAULT_GRADIENT),
            })
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;

    Ok(Adapted::clean(values))
}

/// Maps service rows in display order.
///
/// # Errors
///
/// - [`SchemaError::Columns`] - header differs from `name,link_id,gradient`
/// - [`SchemaError::MissingField`] - a row has no `name` or `link_id`
/// - [`SchemaError::InvalidLinkId`] - `link_id` is not a lowercase-hyphen token
pub fn adapt_services(feed: &ParsedFeed) -> Result<Adapted<Vec<ServiceSummary>>, SchemaError> {
    debug_assert_eq!(feed.kind, FeedKind::Services);
    check_columns(feed)?;

    let services = feed
        .rows
        .iter()
        .map(|row| {
            let link_id = required(feed.kind, row, "link_id")?;
            if !is_link_token(link_id) {
                return Err(SchemaError::InvalidLinkId {
                    feed: feed.kind,
                    line: row.line(),
                    link_id: link_id.to_string(),
                });
            }

            Ok(ServiceSummary {
                name: required(feed.kind, row, "name")?.to_string(),
                link_id: link_id.to_string(),
                gradient: or_default(row, "gradient", DEFAULT_GRADIENT),
            })
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;

    Ok(Adapted::clean(services))
}

/// Maps service detail rows, splitting `key_services` on `|`.
///
/// # Errors
///
/// - [`SchemaError::Columns`] - header differs from the eight detail columns
/// - [`SchemaError::MissingField`] - a row has no `service_id` or `title`
/// - [`SchemaError::InvalidImagePosition`] - `image_position` is not `left`/`right`
pub fn adapt_service_details(
    feed: &ParsedFeed,
) -> Result<Adapted<Vec<ServiceDetail>>, SchemaError> {
    debug_assert_eq!(feed.kind, FeedKind::ServiceDetails);
    check_columns(feed)?;

    let details = feed
        .rows
        .iter()
        .map(|row| {
            let service_id = required(feed.kind, row, "service_id")?;
            let position = super::cell(row, "image_position");
            let image_position =
                ImagePosition::parse(position).ok_or_else(|| SchemaError::InvalidImagePosition {
                    service_id: service_id.to_string(),
                    value: position.to_string(),
                })?;

            Ok(ServiceDetail {
                service_id: service_id.to_string(),
                title: required(feed.kind, row, "title")?.to_string(),
                intro: super::cell(row, "intro").to_string(),
                bullets_title: or_default(row, "bullets_title", DEFAULT_BULLETS_TITLE),
                key_services: parse_key_services(super::cell(row, "key_services")),
                closing: super::cell(row, "closing").to_string(),
                bg_image: super::cell(row, "bg_image").to_string(),
                image_position,
            })
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;

    Ok(Adapted::clean(details))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::parse_csv;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const DETAIL_HEADER: &str =
        "service_id,title,intro,bullets_title,key_services,closing,bg_image,image_position\n";

    fn feed(kind: FeedKind, input: &str) -> ParsedFeed {
        parse_csv(kind, input.as_bytes()).unwrap()
    }

    #[test]
    fn test_key_services_split() {
        assert_eq!(parse_key_services("A | B | C"), vec!["A", "B", "C"]);
        assert_eq!(parse_key_services("A||B"), vec!["A", "B"]);
        assert!(parse_key_services("").is_empty());
        assert!(parse_key_services(" | | ").is_empty());
    }

    #[test]
    fn test_image_position_normalizes() {
        assert_eq!(ImagePosition::parse("Right"), Some(ImagePosition::Right));
        assert_eq!(ImagePosition::parse(" LEFT "), Some(ImagePosition::Left));
        assert_eq!(ImagePosition::parse("top"), None);
        assert_eq!(ImagePosition::parse(""), None);
        assert_eq!(
            serde_json::to_string(&ImagePosition::Right).unwrap(),
            "\"right\""
        );
    }

    #[test]
    fn test_link_token() {
        assert!(is_link_token("drilling"));
        assert!(is_link_token("oil-and-gas-2"));
        assert!(!is_link_token("Drilling"));
        assert!(!is_link_token("oil--gas"));
        assert!(!is_link_token("-oil"));
        assert!(!is_link_token("oil gas"));
        assert!(!is_link_token(""));
    }

    #[test]
    fn test_core_values_preserve_order_and_defaults() {
        let input = "icon,title,description,gradient\n\
                     ⚡,Integrity,We keep our word,from-red-500 to-pink-500\n\
                     ,Safety,Safety first,\n";
        let adapted = adapt_core_values(&feed(FeedKind::Values, input)).unwrap();
        assert_eq!(
            adapted.record,
            vec![
                CoreValue {
                    icon: "⚡".to_string(),
                    title: "Integrity".to_string(),
                    description: "We keep our word".to_string(),
                    gradient: "from-red-500 to-pink-500".to_string(),
                },
                CoreValue {
                    icon: DEFAULT_ICON.to_string(),
                    title: "Safety".to_string(),
                    description: "Safety first".to_string(),
                    gradient: DEFAULT_GRADIENT.to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_core_value_requires_title() {
        let input = "icon,title,description,gradient\n⚡,,desc,g\n";
        let err = adapt_core_values(&feed(FeedKind::Values, input)).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingField {
                feed: FeedKind::Values,
                line: 2,
                column: "title",
            }
        );
    }

    #[test]
    fn test_services_adapted_in_order() {
        let input = "name,link_id,gradient\nDrilling,drilling,g1\nHauling,hauling,\n";
        let adapted = adapt_services(&feed(FeedKind::Services, input)).unwrap();
        let ids: Vec<_> = adapted.record.iter().map(|s| s.link_id.as_str()).collect();
        assert_eq!(ids, vec!["drilling", "hauling"]);
        assert_eq!(adapted.record[1].gradient, DEFAULT_GRADIENT);
    }

    #[test]
    fn test_services_reject_bad_link_id() {
        let input = "name,link_id,gradient\nDrilling,Drilling Ops,g1\n";
        let err = adapt_services(&feed(FeedKind::Services, input)).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidLinkId { line: 2, .. }));
    }

    #[test]
    fn test_services_extra_column_is_schema_error() {
        let input = "name,link_id,gradient,order\nDrilling,drilling,g1,1\n";
        let err = adapt_services(&feed(FeedKind::Services, input)).unwrap_err();
        assert!(matches!(err, SchemaError::Columns { .. }));
    }

    #[test]
    fn test_service_detail_full_row() {
        let input = format!(
            "{DETAIL_HEADER}drilling,Drilling,intro text,Key:,X | Y,closing text,http://img,left\n"
        );
        let adapted = adapt_service_details(&feed(FeedKind::ServiceDetails, &input)).unwrap();
        assert_eq!(
            adapted.record,
            vec![ServiceDetail {
                service_id: "drilling".to_string(),
                title: "Drilling".to_string(),
                intro: "intro text".to_string(),
                bullets_title: "Key:".to_string(),
                key_services: vec!["X".to_string(), "Y".to_string()],
                closing: "closing text".to_string(),
                bg_image: "http://img".to_string(),
                image_position: ImagePosition::Left,
            }]
        );
    }

    #[test]
    fn test_service_detail_bullets_title_default() {
        let input = format!("{DETAIL_HEADER}drilling,Drilling,,,,,,Right\n");
        let adapted = adapt_service_details(&feed(FeedKind::ServiceDetails, &input)).unwrap();
        assert_eq!(adapted.record[0].bullets_title, DEFAULT_BULLETS_TITLE);
        assert_eq!(adapted.record[0].image_position, ImagePosition::Right);
        assert!(adapted.record[0].key_services.is_empty());
    }

    #[test]
    fn test_service_detail_bad_position_names_service() {
        let input = format!("{DETAIL_HEADER}drilling,Drilling,,,,,,top\n");
        let err = adapt_service_details(&feed(FeedKind::ServiceDetails, &input)).unwrap_err();
        assert_eq!(
            err,
            SchemaError::InvalidImagePosition {
                service_id: "drilling".to_string(),
                value: "top".to_string(),
            }
        );
        assert!(err.to_string().contains("'drilling'"));
    }

    proptest! {
        #[test]
        fn prop_key_services_roundtrip(items in prop::collection::vec("[A-Za-z0-9][A-Za-z0-9 ]{0,10}[A-Za-z0-9]", 0..8)) {
            let cell = items.join(" | ");
            prop_assert_eq!(parse_key_services(&cell), items);
        }

        #[test]
        fn prop_key_services_never_yields_blank(cell in "[A-Za-z |]{0,40}") {
            for segment in parse_key_services(&cell) {
                prop_assert!(!segment.is_empty());
                prop_assert!(!segment.contains(KEY_SERVICES_DELIMITER));
                prop_assert_eq!(segment.trim(), segment.as_str());
            }
        }

        #[test]
        fn prop_image_position_case_insensitive(word in "(?i)(left|right)") {
            prop_assert!(ImagePosition::parse(&word).is_some());
        }
    }
}
