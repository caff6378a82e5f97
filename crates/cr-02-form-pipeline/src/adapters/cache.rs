//! In-memory form cache.

use crate::ports::outbound::FormCache;
use chrono::Utc;
use parking_lot::RwLock;
use shared_types::{Form, FormId, SearchCriteria, StatusFilter};
use std::collections::HashMap;
use tracing::debug;

/// Forms indexed by id, guarded by a `parking_lot` lock.
#[derive(Default)]
pub struct InMemoryFormCache {
    forms: RwLock<HashMap<FormId, Form>>,
}

impl InMemoryFormCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.forms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.read().is_empty()
    }
}

impl FormCache for InMemoryFormCache {
    fn find_by_id(&self, id: &FormId) -> Option<Form> {
        self.forms.read().get(id).cloned()
    }

    /// Results are ordered by commit height.
    fn search(&self, criteria: &SearchCriteria, status: StatusFilter) -> Vec<Form> {
        let mut matches: Vec<Form> = self
            .forms
            .read()
            .values()
            .filter(|form| status.admits(form.status) && criteria.matches(form))
            .cloned()
            .collect();
        matches.sort_by_key(|form| form.height);
        matches
    }

    fn mark_resolved(&self, id: &FormId) -> bool {
        let mut forms = self.forms.write();
        let changed = forms.get_mut(id).is_some_and(|form| form.resolve(Utc::now()));
        if changed {
            debug!(form_id = %id, "Form resolved");
        }
        changed
    }

    fn insert(&self, form: Form) {
        debug!(form_id = %form.id, kind = %form.kind, "Form indexed");
        self.forms.write().insert(form.id.clone(), form);
    }
}
