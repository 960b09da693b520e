//! Collection query engine.
//!
//! Listing and searching share one pipeline:
//!
//! ```text
//! tickets ──filter──▶ matching ──sort (key, then id asc)──▶ ordered ──paginate──▶ Page
//! ```
//!
//! Filtering always runs over the whole collection before a page is cut, so
//! `total_elements` counts every match and no match is hidden on a page the
//! caller never requested.

use crate::error::HelpdeskError;
use crate::types::{Ticket, TicketPriority, TicketStatus};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Conjunctive ticket filter. `None` fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketFilter {
    /// Case-insensitive substring of title or description
    pub text: Option<String>,
    /// Exact status
    pub status: Option<TicketStatus>,
    /// Exact priority
    pub priority: Option<TicketPriority>,
}

impl TicketFilter {
    /// Filter on text only
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Restrict to `status`
    #[must_use]
    pub const fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to `priority`
    #[must_use]
    pub const fn with_priority(mut self, priority: TicketPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    fn needle(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }

    /// Whether `ticket` passes every supplied criterion.
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        if self.status.is_some_and(|s| s != ticket.status()) {
            return false;
        }
        if self.priority.is_some_and(|p| p != ticket.priority()) {
            return false;
        }
        self.needle().is_none_or(|needle| {
            ticket.title().to_lowercase().contains(&needle)
                || ticket.description().to_lowercase().contains(&needle)
        })
    }
}

/// Field a listing is ordered by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Creation time
    #[default]
    CreatedAt,
    /// Last modification time
    UpdatedAt,
    /// Urgency
    Priority,
    /// Lifecycle position
    Status,
    /// Title, case-insensitive
    Title,
}

impl FromStr for SortKey {
    type Err = HelpdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "createdAt" | "created_at" => Ok(Self::CreatedAt),
            "updatedAt" | "updated_at" => Ok(Self::UpdatedAt),
            "priority" => Ok(Self::Priority),
            "status" => Ok(Self::Status),
            "title" => Ok(Self::Title),
            other => Err(HelpdeskError::invalid(
                "sortBy",
                format!("Cannot sort by `{other}`"),
            )),
        }
    }
}

/// Sort direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    Asc,
    /// Largest first
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = HelpdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(HelpdeskError::invalid(
                "sortDir",
                format!("Sort direction must be asc or desc, got `{other}`"),
            )),
        }
    }
}

/// Ordering of a listing. Ties on the key always fall back to `id` ascending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sort {
    /// Primary key
    pub key: SortKey,
    /// Direction of the primary key
    pub direction: SortDirection,
}

impl Sort {
    /// Sort by `key` in `direction`
    #[must_use]
    pub const fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Total order over tickets for this sort.
    #[must_use]
    pub fn compare(&self, a: &Ticket, b: &Ticket) -> Ordering {
        let primary = match self.key {
            SortKey::CreatedAt => a.created_at().cmp(&b.created_at()),
            SortKey::UpdatedAt => a.updated_at().cmp(&b.updated_at()),
            SortKey::Priority => a.priority().cmp(&b.priority()),
            SortKey::Status => a.status().cmp(&b.status()),
            SortKey::Title => a.title().to_lowercase().cmp(&b.title().to_lowercase()),
        };
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id().cmp(&b.id()))
    }
}

/// A zero-indexed page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    size: usize,
}

impl PageRequest {
    /// Page size used when a caller does not ask for one
    pub const DEFAULT_SIZE: usize = 10;

    /// Request page `page` of `size` items.
    ///
    /// # Errors
    ///
    /// A size of zero is rejected.
    pub fn new(page: usize, size: usize) -> Result<Self, HelpdeskError> {
        if size == 0 {
            return Err(HelpdeskError::invalid("size", "Page size must be at least 1"));
        }
        Ok(Self { page, size })
    }

    /// Like [`PageRequest::new`], with `size` capped at `max`.
    ///
    /// # Errors
    ///
    /// A size of zero is rejected.
    pub fn bounded(page: usize, size: usize, max: usize) -> Result<Self, HelpdeskError> {
        Self::new(page, size.min(max.max(1)))
    }

    /// Zero-based page index
    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    /// Items per page
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Same size, another page
    #[must_use]
    pub const fn with_page(self, page: usize) -> Self {
        Self { page, ..self }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: Self::DEFAULT_SIZE,
        }
    }
}

impl fmt::Display for PageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} (size {})", self.page, self.size)
    }
}

/// One page of a filtered, ordered collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page
    pub content: Vec<T>,
    /// Matches across all pages
    pub total_elements: usize,
    /// `ceil(total_elements / size)`, 0 for an empty result
    pub total_pages: usize,
    /// Zero-based page index
    pub page: usize,
    /// Requested page size
    pub size: usize,
    /// `page == 0`
    pub is_first: bool,
    /// `page + 1 >= total_pages`
    pub is_last: bool,
}

impl<T> Page<T> {
    /// A page with no matches
    #[must_use]
    pub fn empty(request: PageRequest) -> Self {
        paginate(Vec::new(), request)
    }

    /// Convert every item, keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            page: self.page,
            size: self.size,
            is_first: self.is_first,
            is_last: self.is_last,
        }
    }
}

/// Number of pages needed for `total` items of `size` each.
#[must_use]
pub const fn total_pages(total: usize, size: usize) -> usize {
    if size == 0 { 0 } else { total.div_ceil(size) }
}

/// Cut `request`'s page out of an already filtered and ordered collection.
#[must_use]
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total_elements = items.len();
    let pages = total_pages(total_elements, request.size);
    let content = items
        .into_iter()
        .skip(request.page.saturating_mul(request.size))
        .take(request.size)
        .collect();

    Page {
        content,
        total_elements,
        total_pages: pages,
        page: request.page,
        size: request.size,
        is_first: request.page == 0,
        is_last: request.page >= pages.saturating_sub(1),
    }
}

/// Filter, order and paginate.
#[must_use]
pub fn list_sorted<'a>(
    tickets: impl IntoIterator<Item = &'a Ticket>,
    filter: &TicketFilter,
    sort: Sort,
    request: PageRequest,
) -> Page<Ticket> {
    let mut matching: Vec<Ticket> = tickets
        .into_iter()
        .filter(|t| filter.matches(t))
        .cloned()
        .collect();
    matching.sort_by(|a, b| sort.compare(a, b));
    paginate(matching, request)
}

/// Filter and paginate in the default order (newest first).
#[must_use]
pub fn list<'a>(
    tickets: impl IntoIterator<Item = &'a Ticket>,
    filter: &TicketFilter,
    request: PageRequest,
) -> Page<Ticket> {
    list_sorted(tickets, filter, Sort::default(), request)
}

/// Text search over the whole collection, then paginate.
#[must_use]
pub fn search<'a>(
    tickets: impl IntoIterator<Item = &'a Ticket>,
    query: &str,
    request: PageRequest,
) -> Page<Ticket> {
    list(tickets, &TicketFilter::text(query), request)
}

/// Everything a listing request carries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketQuery {
    /// Which tickets
    pub filter: TicketFilter,
    /// In which order
    pub sort: Sort,
    /// Which page
    pub page: PageRequest,
}

impl TicketQuery {
    /// Run this query over `tickets`.
    #[must_use]
    pub fn run<'a>(&self, tickets: impl IntoIterator<Item = &'a Ticket>) -> Page<Ticket> {
        list_sorted(tickets, &self.filter, self.sort, self.page)
    }

    /// Same query on another page
    #[must_use]
    pub fn at_page(&self, page: usize) -> Self {
        Self {
            page: self.page.with_page(page),
            ..self.clone()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{TicketDraft, TicketId, UserId};
    use chrono::{DateTime, Duration, Utc};
    use helpdesk_core::environment::Clock;

    fn t0() -> DateTime<Utc> {
        helpdesk_testing::test_clock().now()
    }

    fn ticket(title: &str, description: &str, minutes: i64) -> Ticket {
        Ticket::open(
            TicketId::new(),
            TicketDraft::new(title, description, TicketPriority::Medium),
            UserId::new(),
            t0() + Duration::minutes(minutes),
        )
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 10), 3);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = PageRequest::new(0, 0).unwrap_err();
        assert!(err.validation_errors().and_then(|e| e.get("size")).is_some());
        assert_eq!(PageRequest::bounded(0, 500, 100).unwrap().size(), 100);
    }

    #[test]
    fn empty_collection_page() {
        let page = list(&Vec::<Ticket>::new(), &TicketFilter::default(), PageRequest::default());
        assert_eq!(page.total_elements, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.is_first);
        assert!(page.is_last);
        assert!(page.content.is_empty());
    }

    #[test]
    fn newest_first_with_id_tie_break() {
        let older = ticket("a", "", 0);
        let same_a = ticket("b", "", 5);
        let same_b = ticket("c", "", 5);
        let tickets = vec![older.clone(), same_a.clone(), same_b.clone()];

        let page = list(&tickets, &TicketFilter::default(), PageRequest::default());
        let ids: Vec<_> = page.content.iter().map(Ticket::id).collect();

        let (first, second) = if same_a.id() < same_b.id() {
            (same_a.id(), same_b.id())
        } else {
            (same_b.id(), same_a.id())
        };
        assert_eq!(ids, vec![first, second, older.id()]);
    }

    #[test]
    fn text_filter_is_case_insensitive_over_title_and_description() {
        let tickets = vec![
            ticket("Printer jam", "", 0),
            ticket("Email", "The PRINTER on floor 2", 1),
            ticket("VPN", "", 2),
        ];

        let page = search(&tickets, "printer", PageRequest::default());
        assert_eq!(page.total_elements, 2);

        let blank = search(&tickets, "   ", PageRequest::default());
        assert_eq!(blank.total_elements, 3);
    }

    #[test]
    fn sorts_by_priority_ascending() {
        let mut low = ticket("low", "", 0);
        low.priority = TicketPriority::Low;
        let mut critical = ticket("critical", "", 1);
        critical.priority = TicketPriority::Critical;
        let tickets = vec![critical, low];

        let page = list_sorted(
            &tickets,
            &TicketFilter::default(),
            Sort::new(SortKey::Priority, SortDirection::Asc),
            PageRequest::default(),
        );
        assert_eq!(page.content[0].title(), "low");
    }

    #[test]
    fn last_page_is_partial() {
        let tickets: Vec<_> = (0..25).map(|i| ticket("t", "", i)).collect();
        let query = TicketQuery {
            page: PageRequest::new(2, 10).unwrap(),
            ..TicketQuery::default()
        };
        let page = query.run(&tickets);

        assert_eq!(page.content.len(), 5);
        assert_eq!(page.total_pages, 3);
        assert!(!page.is_first);
        assert!(page.is_last);

        let beyond = query.at_page(7).run(&tickets);
        assert!(beyond.content.is_empty());
        assert_eq!(beyond.total_elements, 25);
    }

    #[test]
    fn page_index_at_the_edges() {
        let tickets: Vec<_> = (0..20).map(|i| ticket("t", "", i)).collect();

        let last = list(&tickets, &TicketFilter::default(), PageRequest::new(1, 10).unwrap());
        assert_eq!(last.total_pages, 2);
        assert_eq!(last.content.len(), 10);
        assert!(last.is_last);

        let before_last = list(&tickets, &TicketFilter::default(), PageRequest::new(0, 10).unwrap());
        assert!(!before_last.is_last);

        let huge = list(&tickets, &TicketFilter::default(), PageRequest::new(usize::MAX, 10).unwrap());
        assert!(huge.content.is_empty());
        assert_eq!(huge.page, usize::MAX);
        assert_eq!(huge.total_elements, 20);
        assert!(huge.is_last);
        assert!(!huge.is_first);

        let huge_size = list(&tickets, &TicketFilter::default(), PageRequest::new(usize::MAX, usize::MAX).unwrap());
        assert!(huge_size.content.is_empty());
        assert_eq!(huge_size.total_pages, 1);
    }

    #[test]
    fn sort_key_parsing() {
        assert_eq!("createdAt".parse::<SortKey>().unwrap(), SortKey::CreatedAt);
        assert_eq!("DESC".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!("colour".parse::<SortKey>().is_err());
    }

    #[test]
    fn page_map_keeps_metadata() {
        let tickets: Vec<_> = (0..3).map(|i| ticket("t", "", i)).collect();
        let page = list(&tickets, &TicketFilter::default(), PageRequest::new(0, 2).unwrap());
        let titles = page.map(|t| t.title().to_string());
        assert_eq!(titles.content.len(), 2);
        assert_eq!(titles.total_pages, 2);
        assert_eq!(titles.total_elements, 3);
    }
}
