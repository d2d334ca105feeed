//! Joins the Services tab with the ServiceDetails tab.
//!
//! The Services tab owns display order and the set of services; the
//! ServiceDetails tab must describe exactly that set. Integrity is checked
//! in both directions so a typo in either tab surfaces as a distinct error:
//! a `link_id` with no detail is [`IntegrityError::MissingDetail`], a detail
//! nobody links to is [`IntegrityError::OrphanDetail`].

use crate::schema::{ImagePosition, ServiceDetail, ServiceSummary};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("link_id '{0}' appears more than once in the services feed")]
    DuplicateLinkId(String),

    #[error("service_id '{0}' appears more than once in the service_details feed")]
    DuplicateServiceId(String),

    #[error("service '{missing_detail_for}' has no matching row in the service_details feed")]
    MissingDetail { missing_detail_for: String },

    #[error("service_details row '{orphan_detail}' matches no link_id in the services feed")]
    OrphanDetail { orphan_detail: String },
}

/// A service summary joined with its detail, as the renderer consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedService {
    pub name: String,
    pub link_id: String,
    pub gradient: String,
    pub title: String,
    pub intro: String,
    pub bullets_title: String,
    pub key_services: Vec<String>,
    pub closing: String,
    pub bg_image: String,
    pub image_position: ImagePosition,
}

impl MergedService {
    fn join(summary: ServiceSummary, detail: ServiceDetail) -> Self {
        Self {
            name: summary.name,
            link_id: summary.link_id,
            gradient: summary.gradient,
            title: detail.title,
            intro: detail.intro,
            bullets_title: detail.bullets_title,
            key_services: detail.key_services,
            closing: detail.closing,
            bg_image: detail.bg_image,
            image_position: detail.image_position,
        }
    }
}

/// Merges summaries with details on `link_id == service_id`.
///
/// Output follows `summaries` order. Uniqueness on both sides is checked
/// before any lookup, then each direction of the join is checked on its
/// own pass.
pub fn reconcile(
    summaries: Vec<ServiceSummary>,
    details: Vec<ServiceDetail>,
) -> Result<Vec<MergedService>, IntegrityError> {
    let mut link_ids = HashSet::with_capacity(summaries.len());
    for summary in &summaries {
        if !link_ids.insert(summary.link_id.as_str()) {
            return Err(IntegrityError::DuplicateLinkId(summary.link_id.clone()));
        }
    }

    let mut index: HashMap<String, usize> = HashMap::with_capacity(details.len());
    for (i, detail) in details.iter().enumerate() {
        if index.insert(detail.service_id.clone(), i).is_some() {
            return Err(IntegrityError::DuplicateServiceId(detail.service_id.clone()));
        }
    }

    // Pass one: every summary resolves to a detail.
    let mut pairing = Vec::with_capacity(summaries.len());
    for summary in &summaries {
        match index.remove(&summary.link_id) {
            Some(i) => pairing.push(i),
            None => {
                return Err(IntegrityError::MissingDetail {
                    missing_detail_for: summary.link_id.clone(),
                })
            }
        }
    }

    // Pass two: whatever was never consulted is an orphan. Report the one
    // that appears first in the feed.
    if let Some(orphan) = details
        .iter()
        .find(|d| index.contains_key(&d.service_id))
    {
        return Err(IntegrityError::OrphanDetail {
            orphan_detail: orphan.service_id.clone(),
        });
    }

    let mut details: Vec<Option<ServiceDetail>> = details.into_iter().map(Some).collect();
    let merged = summaries
        .into_iter()
        .zip(pairing)
        .filter_map(|(summary, i)| details[i].take().map(|d| MergedService::join(summary, d)))
        .collect::<Vec<_>>();

    tracing::debug!(services = merged.len(), "Reconciled services");
    Ok(merged)
}
