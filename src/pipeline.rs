//! One end-to-end run: fetch, parse, adapt, reconcile, assemble, write.
//!
//! The run is all-or-nothing. Every feed is fetched and ingested before
//! anything is combined; if any feed failed, the run stops there and the
//! writer is never called, so the previous artifact stays in place.

use crate::config::{Config, ConfigError};
use crate::document::{ContentDocument, FeedOutputs};
use crate::feed::{fetch_all, parse_csv, FeedKind, FetchError, ParseError};
use crate::reconcile::{reconcile, IntegrityError};
use crate::schema::{
    adapt_core_values, adapt_key_value, adapt_service_details, adapt_services, Adapted,
    CoreValue, KeyValueRecord, SchemaError, ServiceDetail, ServiceSummary,
};
use crate::writer::{write_artifact, WriteError, WriteOutcome};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("service integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Build and validate the document but do not write it.
    pub dry_run: bool,
}

/// Per-feed counts from a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSummary {
    pub kind: FeedKind,
    pub rows: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub feeds: Vec<FeedSummary>,
    pub document: ContentDocument,
    /// `None` on a dry run.
    pub write: Option<WriteOutcome>,
}

impl RunReport {
    pub fn warnings(&self) -> usize {
        self.feeds.iter().map(|f| f.skipped).sum()
    }
}

/// A feed's adapter output. The variant identifies the feed.
#[derive(Debug)]
enum AdaptedFeed {
    General(Adapted<KeyValueRecord>),
    Hero(Adapted<KeyValueRecord>),
    About(Adapted<KeyValueRecord>),
    Contact(Adapted<KeyValueRecord>),
    CoreValues(Adapted<Vec<CoreValue>>),
    Services(Adapted<Vec<ServiceSummary>>),
    ServiceDetails(Adapted<Vec<ServiceDetail>>),
}

impl AdaptedFeed {
    fn summary(&self) -> FeedSummary {
        let (kind, rows, skipped) = match self {
            AdaptedFeed::General(a) => (FeedKind::General, a.record.len(), a.skipped.len()),
            AdaptedFeed::Hero(a) => (FeedKind::Hero, a.record.len(), a.skipped.len()),
            AdaptedFeed::About(a) => (FeedKind::About, a.record.len(), a.skipped.len()),
            AdaptedFeed::Contact(a) => (FeedKind::Contact, a.record.len(), a.skipped.len()),
            AdaptedFeed::CoreValues(a) => (FeedKind::Values, a.record.len(), a.skipped.len()),
            AdaptedFeed::Services(a) => (FeedKind::Services, a.record.len(), a.skipped.len()),
            AdaptedFeed::ServiceDetails(a) => {
                (FeedKind::ServiceDetails, a.record.len(), a.skipped.len())
            }
        };
        FeedSummary {
            kind,
            rows,
            skipped,
        }
    }
}

/// Parses and adapts one feed's bytes according to its identity.
fn ingest(kind: FeedKind, bytes: &[u8]) -> Result<AdaptedFeed, PipelineError> {
    let parsed = parse_csv(kind, bytes)?;
    let adapted = match kind {
        FeedKind::General => AdaptedFeed::General(adapt_key_value(&parsed)?),
        FeedKind::Hero => AdaptedFeed::Hero(adapt_key_value(&parsed)?),
        FeedKind::About => AdaptedFeed::About(adapt_key_value(&parsed)?),
        FeedKind::Contact => AdaptedFeed::Contact(adapt_key_value(&parsed)?),
        FeedKind::Values => AdaptedFeed::CoreValues(adapt_core_values(&parsed)?),
        FeedKind::Services => AdaptedFeed::Services(adapt_services(&parsed)?),
        FeedKind::ServiceDetails => AdaptedFeed::ServiceDetails(adapt_service_details(&parsed)?),
    };
    Ok(adapted)
}

/// Collects adapted feeds until all seven are present.
#[derive(Default)]
struct Slots {
    general: Option<KeyValueRecord>,
    hero: Option<KeyValueRecord>,
    about: Option<KeyValueRecord>,
    contact: Option<KeyValueRecord>,
    core_values: Option<Vec<CoreValue>>,
    services: Option<Vec<ServiceSummary>>,
    service_details: Option<Vec<ServiceDetail>>,
}

impl Slots {
    fn fill(&mut self, feed: AdaptedFeed) {
        match feed {
            AdaptedFeed::General(a) => self.general = Some(a.record),
            AdaptedFeed::Hero(a) => self.hero = Some(a.record),
            AdaptedFeed::About(a) => self.about = Some(a.record),
            AdaptedFeed::Contact(a) => self.contact = Some(a.record),
            AdaptedFeed::CoreValues(a) => self.core_values = Some(a.record),
            AdaptedFeed::Services(a) => self.services = Some(a.record),
            AdaptedFeed::ServiceDetails(a) => self.service_details = Some(a.record),
        }
    }

    fn take<T>(slot: Option<T>, kind: FeedKind) -> Result<T, ConfigError> {
        slot.ok_or(ConfigError::MissingFeed(kind))
    }

    /// Joins services and assembles the outputs. Fails if any feed never
    /// arrived.
    fn finish(self) -> Result<FeedOutputs, PipelineError> {
        let summaries = Self::take(self.services, FeedKind::Services)?;
        let details = Self::take(self.service_details, FeedKind::ServiceDetails)?;
        let services = reconcile(summaries, details)?;

        Ok(FeedOutputs {
            general: Self::take(self.general, FeedKind::General)?,
            hero: Self::take(self.hero, FeedKind::Hero)?,
            about: Self::take(self.about, FeedKind::About)?,
            core_values: Self::take(self.core_values, FeedKind::Values)?,
            services,
            contact: Self::take(self.contact, FeedKind::Contact)?,
        })
    }
}

/// Drives one run from a validated [`Config`].
pub struct Pipeline {
    config: Config,
    client: reqwest::Client,
}

impl Pipeline {
    pub fn new(config: Config, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Runs every stage once.
    ///
    /// Failures from several feeds are all logged; the one returned is the
    /// first in [`FeedKind::ALL`] order.
    ///
    /// # Errors
    ///
    /// Any fetch, parse, schema, integrity or write failure. Nothing is
    /// written unless every earlier stage succeeded.
    pub async fn run(&self, options: RunOptions) -> Result<RunReport, PipelineError> {
        let sources = self.config.sources()?;
        let destination = self.config.output_path()?.to_path_buf();

        tracing::info!(feeds = sources.len(), "Fetching feeds");
        let fetched = fetch_all(&self.client, &sources, self.config.limits()).await;

        let mut first_error: Option<PipelineError> = None;
        let mut slots = Slots::default();
        let mut feeds = Vec::with_capacity(fetched.len());

        for (kind, result) in fetched {
            let ingested = result
                .map_err(PipelineError::from)
                .and_then(|bytes| ingest(kind, &bytes));

            match ingested {
                Ok(adapted) => {
                    let summary = adapted.summary();
                    tracing::info!(
                        feed = %kind,
                        rows = summary.rows,
                        skipped = summary.skipped,
                        "Feed ingested"
                    );
                    feeds.push(summary);
                    slots.fill(adapted);
                }
                Err(e) => {
                    tracing::error!(feed = %kind, error = %e, "Feed failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        let outputs = slots.finish()?;
        let document = ContentDocument::assemble(outputs, self.config.image_links);
        tracing::info!(
            core_values = document.core_values.len(),
            services = document.services.len(),
            "Assembled content document"
        );

        let write = if options.dry_run {
            tracing::info!(path = %destination.display(), "Dry run, artifact not written");
            None
        } else {
            Some(write_artifact(&document, &destination)?)
        };

        Ok(RunReport {
            feeds,
            document,
            write,
        })
    }
}
