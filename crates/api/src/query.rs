//! Listing query parameters.
//!
//! Every value is taken as a string so that a non-integer `page` becomes a
//! 422 field error ("must be an integer value") instead of a deserializer
//! rejection.

use forum_core::filters::{read_int, Filters, ListQuery, TextFilter, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use forum_core::validation::FieldErrors;
use serde::Deserialize;

/// `?title=&content=&page=&page_size=&sort=`
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub title: Option<String>,
    pub content: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub sort: Option<String>,
}

impl ListParams {
    /// Paging and sort input, with integer parse problems recorded in
    /// `errors`.
    pub fn filters(&self, errors: &mut FieldErrors) -> Filters {
        Filters {
            page: read_int(errors, "page", self.page.as_deref(), DEFAULT_PAGE),
            page_size: read_int(errors, "page_size", self.page_size.as_deref(), DEFAULT_PAGE_SIZE),
            sort: self
                .sort
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("id")
                .to_string(),
        }
    }

    /// Build a validated [`ListQuery`] that filters on `columns`, reading each
    /// column's term from the parameter of the same name.
    pub fn into_query(
        self,
        columns: &[&'static str],
        safelist: &[&'static str],
    ) -> Result<ListQuery, FieldErrors> {
        let mut errors = FieldErrors::new();
        let filters = self.filters(&mut errors);

        let text = columns
            .iter()
            .filter_map(|&column| {
                let term = match column {
                    "title" => self.title.as_deref(),
                    "content" => self.content.as_deref(),
                    _ => None,
                };
                term.map(|t| TextFilter::new(column, t))
            })
            .collect();

        ListQuery::build(text, &filters, safelist, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forum_core::filters::SortDirection;

    const SAFELIST: &[&str] = &["id", "title", "-id", "-title"];

    #[test]
    fn defaults_when_empty() {
        let query = ListParams::default().into_query(&["title"], SAFELIST).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 20);
        assert_eq!(query.sort.column, "id");
        assert!(query.text.is_empty());
    }

    #[test]
    fn parses_sort_and_text() {
        let params = ListParams {
            title: Some("rust".into()),
            sort: Some("-title".into()),
            page: Some("2".into()),
            ..ListParams::default()
        };
        let query = params.into_query(&["title", "content"], SAFELIST).unwrap();
        assert_eq!(query.sort.column, "title");
        assert_eq!(query.sort.direction, SortDirection::Desc);
        assert_eq!(query.page, 2);
        assert_eq!(query.text.len(), 1);
    }

    #[test]
    fn collects_every_problem() {
        let params = ListParams {
            page: Some("abc".into()),
            page_size: Some("500".into()),
            sort: Some("password".into()),
            ..ListParams::default()
        };
        let errors = params.into_query(&[], SAFELIST).unwrap_err();
        assert_eq!(errors.get("page"), Some("must be an integer value"));
        assert_eq!(errors.get("page_size"), Some("must be a maximum of 100"));
        assert_eq!(errors.get("sort"), Some("invalid sort value"));
    }
}
