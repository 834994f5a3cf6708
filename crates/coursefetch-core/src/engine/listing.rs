//! Resource listings for course and category pages.

use serde::Serialize;

use super::RunStatus;
use crate::discovery::Advisory;
use crate::resolver::ResolvedResource;

/// Resolved resources of one course page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseResources {
    /// Course name from the category listing, else the page heading.
    pub course_name: Option<String>,
    pub course_url: String,
    pub resources: Vec<ResolvedResource>,
    pub advisory: Option<Advisory>,
}

/// A course page that could not be scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseFailure {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub status: RunStatus,
    /// Set when the listed URL was a category page.
    pub category_name: Option<String>,
    pub groups: Vec<CourseResources>,
    pub failures: Vec<CourseFailure>,
}

impl Listing {
    pub(crate) fn empty(category_name: Option<String>) -> Self {
        Self {
            status: RunStatus::Complete,
            category_name,
            groups: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Every resource across groups, in listing order.
    pub fn resources(&self) -> impl Iterator<Item = &ResolvedResource> {
        self.groups.iter().flat_map(|g| g.resources.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.resources.is_empty())
    }
}
