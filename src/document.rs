//! The content document handed to the site renderer.
//!
//! Field order here is the key order of the serialized artifact, and the
//! artifact's shape is relied on by the renderer. Add fields only at the
//! end of a nested object and never rename them.

use crate::reconcile::MergedService;
use crate::schema::{CoreValue, KeyValueRecord};
use crate::util::ImageLinks;
use serde::Serialize;

/// Key in the general feed holding the site logo.
pub const LOGO_FIELD: &str = "logo_url";

/// Every feed's output after adaptation and reconciliation.
///
/// Holding one of these means every feed succeeded; there is no way to
/// build it with a feed missing.
#[derive(Debug, Clone)]
pub struct FeedOutputs {
    pub general: KeyValueRecord,
    pub hero: KeyValueRecord,
    pub about: KeyValueRecord,
    pub core_values: Vec<CoreValue>,
    pub services: Vec<MergedService>,
    pub contact: KeyValueRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentDocument {
    pub general: KeyValueRecord,
    pub hero: KeyValueRecord,
    pub about: KeyValueRecord,
    pub core_values: Vec<CoreValue>,
    pub services: Vec<MergedService>,
    pub contact: KeyValueRecord,
}

impl ContentDocument {
    /// Composes the document, rewriting image links with `image_links`.
    pub fn assemble(outputs: FeedOutputs, image_links: ImageLinks) -> Self {
        let FeedOutputs {
            mut general,
            hero,
            about,
            core_values,
            mut services,
            contact,
        } = outputs;

        if let Some(logo) = general.get_mut(LOGO_FIELD) {
            let rewritten = image_links.apply(logo);
            *logo = rewritten;
        }
        for service in &mut services {
            service.bg_image = image_links.apply(&service.bg_image);
        }

        Self {
            general,
            hero,
            about,
            core_values,
            services,
            contact,
        }
    }

    /// Serialized artifact bytes: pretty JSON with a trailing newline.
    pub fn to_artifact_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
