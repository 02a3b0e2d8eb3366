//! Translation of `GET /tasks` query parameters into store directives.
//!
//! Parsing is lenient on purpose: a value that cannot be understood is dropped
//! and the listing proceeds as if the parameter had not been sent.

use actix_web::web;
use std::cmp::Ordering;

use crate::models::Task;

/// Raw query parameters as received. Every field is optional text.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TaskListParams {
    pub completed: Option<String>,
    pub sort_by: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Description,
    Completed,
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Filter, ordering and window for one owner's task listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub sort: Option<Sort>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

impl SortField {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "description" => Some(SortField::Description),
            "completed" => Some(SortField::Completed),
            "createdAt" => Some(SortField::CreatedAt),
            "updatedAt" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }

    /// Column name in the `tasks` table. Only ever one of these fixed strings.
    pub fn column(self) -> &'static str {
        match self {
            SortField::Description => "description",
            SortField::Completed => "completed",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

impl SortDirection {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl Sort {
    /// Parses `field:direction`. Anything else yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (field, direction) = raw.split_once(':')?;
        Some(Sort {
            field: SortField::parse(field)?,
            direction: SortDirection::parse(direction)?,
        })
    }

    /// Ordering of two tasks under this sort, used by in-memory backends.
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ordering = match self.field {
            SortField::Description => a.description.cmp(&b.description),
            SortField::Completed => a.completed.cmp(&b.completed),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl TaskListParams {
    /// Reads the recognised keys out of a raw query string and never fails.
    ///
    /// A repeated key keeps its last value; unknown keys are dropped.
    pub fn from_query_str(query: &str) -> Self {
        let pairs = web::Query::<Vec<(String, String)>>::from_query(query)
            .map(web::Query::into_inner)
            .unwrap_or_default();

        let mut params = TaskListParams::default();
        for (key, value) in pairs {
            match key.as_str() {
                "completed" => params.completed = Some(value),
                "sortBy" => params.sort_by = Some(value),
                "limit" => params.limit = Some(value),
                "skip" => params.skip = Some(value),
                _ => {}
            }
        }
        params
    }
}

impl From<&TaskListParams> for TaskFilter {
    fn from(params: &TaskListParams) -> Self {
        TaskFilter {
            completed: params.completed.as_deref().and_then(parse_bool),
            sort: params.sort_by.as_deref().and_then(Sort::parse),
            // A zero limit means "no limit".
            limit: params
                .limit
                .as_deref()
                .and_then(parse_count)
                .filter(|limit| *limit > 0),
            skip: params.skip.as_deref().and_then(parse_count),
        }
    }
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.completed.map_or(true, |completed| task.completed == completed)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Non-negative integer, capped at `i64::MAX` so every backend can bind it.
fn parse_count(raw: &str) -> Option<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .map(|count| count.min(i64::MAX as u64))
}
