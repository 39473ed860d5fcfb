//! Per-document context.
//!
//! The [`DocumentContext`] is created by the root document and shared by
//! reference with every node of its tree. It owns the validator registry, the
//! notification channel, the options and the bookkeeping that the walker and
//! nodes update. Nothing in it is shared across documents.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::config::DocumentOptions;
use crate::error::SchemaErrors;
use crate::notify::NotificationChannel;
use crate::registry::ValidatorRegistry;

/// Last recorded validation outcome for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    Valid,
    Invalid(String),
}

impl PathOutcome {
    /// Returns true for a successful outcome.
    pub fn is_valid(&self) -> bool {
        matches!(self, PathOutcome::Valid)
    }
}

/// Counters describing the work a document has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentStats {
    /// Whole-object (or whole-list) validations of prospective state.
    pub whole_validations: usize,
    /// Single-path validator executions.
    pub path_validations: usize,
    /// Child nodes built from composite values.
    pub materializations: usize,
    /// Notifications handed to the channel.
    pub notifications: u64,
}

#[derive(Default)]
struct Counters {
    whole_validations: AtomicUsize,
    path_validations: AtomicUsize,
    materializations: AtomicUsize,
}

/// Shared state of one document tree.
pub(crate) struct DocumentContext {
    validators: ValidatorRegistry,
    channel: Arc<NotificationChannel>,
    options: DocumentOptions,
    outcomes: RwLock<IndexMap<String, PathOutcome>>,
    counters: Counters,
}

impl DocumentContext {
    pub(crate) fn new(options: DocumentOptions) -> Arc<Self> {
        Arc::new(Self {
            validators: ValidatorRegistry::new(),
            channel: NotificationChannel::new(),
            options,
            outcomes: RwLock::new(IndexMap::new()),
            counters: Counters::default(),
        })
    }

    pub(crate) fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    pub(crate) fn channel(&self) -> &Arc<NotificationChannel> {
        &self.channel
    }

    pub(crate) fn options(&self) -> &DocumentOptions {
        &self.options
    }

    pub(crate) fn record(&self, path: String, outcome: PathOutcome) {
        self.outcomes.write().insert(path, outcome);
    }

    /// Records every failing path of a rejected check.
    pub(crate) fn record_failures(&self, errors: &SchemaErrors) {
        let mut outcomes = self.outcomes.write();
        for error in errors.iter() {
            outcomes.insert(
                error.path.to_string(),
                PathOutcome::Invalid(error.message.clone()),
            );
        }
    }

    pub(crate) fn outcome(&self, path: &str) -> Option<PathOutcome> {
        self.outcomes.read().get(path).cloned()
    }

    pub(crate) fn count_whole_validation(&self) {
        self.counters.whole_validations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_path_validation(&self) {
        self.counters.path_validations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_materialization(&self) {
        self.counters.materializations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn stats(&self) -> DocumentStats {
        DocumentStats {
            whole_validations: self.counters.whole_validations.load(Ordering::Relaxed),
            path_validations: self.counters.path_validations.load(Ordering::Relaxed),
            materializations: self.counters.materializations.load(Ordering::Relaxed),
            notifications: self.channel.sent(),
        }
    }
}
