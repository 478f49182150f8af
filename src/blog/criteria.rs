use serde::{Deserialize, Serialize};

/// Which buffer feeds the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Browsing,
    Searching,
}

impl Mode {
    /// Searching iff any criterion is active.
    pub fn for_criteria(criteria: &SearchCriteria) -> Self {
        if criteria.is_active() {
            Self::Searching
        } else {
            Self::Browsing
        }
    }
}

/// Search filters sent as query parameters to `/article/search`.
///
/// A value is active when it is present and not blank. `None` and `""` both
/// mean "unset", and merging only overwrites keys the patch carries, so a
/// caller clearing a filter must send it explicitly as `Some("")`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
    pub title: Option<String>,
    /// Category id, kept as text because it only travels as a query value.
    pub category: Option<String>,
}

impl SearchCriteria {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Shallow merge: every key present in `patch` overwrites ours.
    pub fn merge(&mut self, patch: SearchCriteria) {
        if patch.title.is_some() {
            self.title = patch.title;
        }
        if patch.category.is_some() {
            self.category = patch.category;
        }
    }

    pub fn merged(&self, patch: &SearchCriteria) -> SearchCriteria {
        let mut out = self.clone();
        out.merge(patch.clone());
        out
    }

    pub fn is_active(&self) -> bool {
        is_set(&self.title) || is_set(&self.category)
    }

    /// Active entries as query parameters, in a fixed key order.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        [("title", &self.title), ("category", &self.category)]
            .into_iter()
            .filter(|(_, value)| is_set(value))
            .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
            .collect()
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
