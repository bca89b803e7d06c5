//! Listing filters: text matches, allow-listed sorting and page arithmetic.
//!
//! Query strings are parsed leniently into [`Filters`]; every problem is
//! collected into a [`FieldErrors`] map so the client sees all of them at
//! once. A [`ListQuery`] only exists once validation has passed, which means
//! its sort column always comes from a compile-time allow-list and can be
//! spliced into SQL.

use serde::Serialize;

use crate::validation::FieldErrors;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE: i64 = 10_000_000;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A validated sort: a column from an allow-list plus a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Match `raw` against `safelist`, where entries look like `title` or
    /// `-title` (descending). Anything not listed verbatim is rejected.
    pub fn parse(raw: &str, safelist: &[&'static str]) -> Option<Self> {
        let entry = safelist.iter().copied().find(|entry| *entry == raw)?;
        Some(match entry.strip_prefix('-') {
            Some(column) => SortSpec {
                column,
                direction: SortDirection::Desc,
            },
            None => SortSpec {
                column: entry,
                direction: SortDirection::Asc,
            },
        })
    }
}

/// An optional full-text match against one column. An empty term matches
/// every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFilter {
    pub column: &'static str,
    pub term: String,
}

impl TextFilter {
    pub fn new(column: &'static str, term: impl Into<String>) -> Self {
        Self {
            column,
            term: term.into().trim().to_owned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.term.is_empty()
    }

    /// In-process equivalent of `to_tsvector('simple', value) @@
    /// plainto_tsquery('simple', term)`: every word of the term must appear
    /// as a whole word in `value`, ignoring case and punctuation.
    pub fn matches(&self, value: &str) -> bool {
        let haystack: Vec<String> = words(value).collect();
        words(&self.term).all(|needle| haystack.contains(&needle))
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Raw paging and sort input as read from the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            sort: "id".into(),
        }
    }
}

impl Filters {
    /// Record every paging and sort problem into `errors`. Returns the parsed
    /// sort when it is allowed.
    pub fn check(&self, errors: &mut FieldErrors, safelist: &[&'static str]) -> Option<SortSpec> {
        errors.check(self.page > 0, "page", "must be greater than zero");
        errors.check(self.page <= MAX_PAGE, "page", "must be a maximum of 10 million");
        errors.check(self.page_size > 0, "page_size", "must be greater than zero");
        errors.check(
            self.page_size <= MAX_PAGE_SIZE,
            "page_size",
            "must be a maximum of 100",
        );

        let sort = SortSpec::parse(&self.sort, safelist);
        errors.check(sort.is_some(), "sort", "invalid sort value");
        sort
    }
}

/// A fully validated listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub text: Vec<TextFilter>,
    pub sort: SortSpec,
    pub page: i64,
    pub page_size: i64,
}

impl ListQuery {
    /// Validate `filters` against `safelist`. `errors` may already carry
    /// problems found while reading the query string; they are reported
    /// together with any found here.
    pub fn build(
        text: Vec<TextFilter>,
        filters: &Filters,
        safelist: &[&'static str],
        mut errors: FieldErrors,
    ) -> Result<Self, FieldErrors> {
        let sort = filters.check(&mut errors, safelist);
        match sort {
            Some(sort) if errors.is_empty() => Ok(Self {
                text,
                sort,
                page: filters.page,
                page_size: filters.page_size,
            }),
            _ => Err(errors),
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }

    /// Non-empty text filters only.
    pub fn active_text(&self) -> impl Iterator<Item = &TextFilter> {
        self.text.iter().filter(|f| !f.is_empty())
    }
}

/// Paging metadata for a listing. Serializes as `{}` when there are no
/// records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_records: i64,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl Metadata {
    pub fn calculate(total_records: i64, page: i64, page_size: i64) -> Self {
        if total_records == 0 || page_size <= 0 {
            return Self::default();
        }
        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: (total_records + page_size - 1) / page_size,
            total_records,
        }
    }
}

/// Parse an optional integer query value, falling back to `default` when
/// absent and recording "must be an integer value" when unparsable.
pub fn read_int(errors: &mut FieldErrors, field: &str, raw: Option<&str>, default: i64) -> i64 {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => default,
        Some(s) => s.parse().unwrap_or_else(|_| {
            errors.add(field, "must be an integer value");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SAFELIST: &[&str] = &["id", "title", "-id", "-title"];

    #[test]
    fn sort_parses_direction_from_prefix() {
        assert_eq!(
            SortSpec::parse("-title", SAFELIST),
            Some(SortSpec {
                column: "title",
                direction: SortDirection::Desc
            })
        );
        assert_eq!(SortSpec::parse("id", SAFELIST).unwrap().direction, SortDirection::Asc);
    }

    #[test]
    fn sort_outside_safelist_is_rejected() {
        assert_eq!(SortSpec::parse("content", SAFELIST), None);
        assert_eq!(SortSpec::parse("id; DROP TABLE forum", SAFELIST), None);
        assert_eq!(SortSpec::parse("--id", SAFELIST), None);
    }

    #[test]
    fn paging_bounds_are_enforced() {
        let filters = Filters {
            page: 0,
            page_size: 101,
            sort: "id".into(),
        };
        let errors = ListQuery::build(vec![], &filters, SAFELIST, FieldErrors::new()).unwrap_err();
        assert_eq!(errors.get("page"), Some("must be greater than zero"));
        assert_eq!(errors.get("page_size"), Some("must be a maximum of 100"));

        let filters = Filters {
            page: MAX_PAGE + 1,
            ..Filters::default()
        };
        let errors = ListQuery::build(vec![], &filters, SAFELIST, FieldErrors::new()).unwrap_err();
        assert_eq!(errors.get("page"), Some("must be a maximum of 10 million"));
    }

    #[test]
    fn earlier_errors_block_an_otherwise_valid_query() {
        let mut errors = FieldErrors::new();
        let page = read_int(&mut errors, "page", Some("abc"), DEFAULT_PAGE);
        assert_eq!(page, DEFAULT_PAGE);

        let filters = Filters {
            page,
            ..Filters::default()
        };
        let errors = ListQuery::build(vec![], &filters, SAFELIST, errors).unwrap_err();
        assert_eq!(errors.get("page"), Some("must be an integer value"));
    }

    #[test]
    fn limit_and_offset_follow_page() {
        let filters = Filters {
            page: 3,
            page_size: 10,
            sort: "-id".into(),
        };
        let query = ListQuery::build(vec![], &filters, SAFELIST, FieldErrors::new()).unwrap();
        assert_eq!(query.limit(), 10);
        assert_eq!(query.offset(), 20);
        assert_matches!(query.sort.direction, SortDirection::Desc);
    }

    #[test]
    fn read_int_defaults_when_absent() {
        let mut errors = FieldErrors::new();
        assert_eq!(read_int(&mut errors, "page_size", None, 20), 20);
        assert_eq!(read_int(&mut errors, "page_size", Some(""), 20), 20);
        assert_eq!(read_int(&mut errors, "page_size", Some("7"), 20), 7);
        assert!(errors.is_empty());
    }

    #[test]
    fn metadata_rounds_last_page_up() {
        let meta = Metadata::calculate(21, 2, 10);
        assert_eq!(meta.first_page, 1);
        assert_eq!(meta.last_page, 3);
        assert_eq!(meta.current_page, 2);
        assert_eq!(meta.total_records, 21);
    }

    #[test]
    fn empty_metadata_serializes_as_empty_object() {
        let json = serde_json::to_value(Metadata::calculate(0, 1, 20)).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn text_filter_matches_whole_words_case_insensitively() {
        let filter = TextFilter::new("title", "Rust Async");
        assert!(filter.matches("async programming in rust"));
        assert!(!filter.matches("rusty async"));
        assert!(TextFilter::new("title", "  ").matches("anything"));
    }
}
