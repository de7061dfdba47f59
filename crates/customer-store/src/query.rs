//! Compiled customer predicates shared by the store adapters.
//!
//! A [`CustomerQuery`] is built once from the port's filter types and then
//! either evaluated against records in memory or pushed into SQL, so the
//! page fetch and the count of a search always see the same predicate.

use common::PageRequest;
use domain::{CustomerFilters, CustomerSearch};
use sqlx::{Postgres, QueryBuilder};

use crate::record::CustomerRecord;

/// Which rows a query may see with respect to soft deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Liveness {
    /// Rows not flagged as deleted.
    #[default]
    Live,
    /// Only soft-deleted rows.
    Deleted,
    /// Every row.
    Any,
}

/// How a text column is compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatch {
    /// Case-insensitive substring.
    Contains(String),
    /// Case-insensitive equality.
    Equals(String),
}

impl TextMatch {
    fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        let value = value.to_lowercase();
        match self {
            TextMatch::Contains(term) => value.contains(&term.to_lowercase()),
            TextMatch::Equals(term) => value == term.to_lowercase(),
        }
    }

    fn push_sql(&self, column: &str, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            TextMatch::Contains(term) => {
                qb.push(format!(" AND {column} ILIKE "));
                qb.push_bind(like_pattern(term));
                qb.push(" ESCAPE '\\'");
            }
            TextMatch::Equals(term) => {
                qb.push(format!(" AND lower({column}) = lower("));
                qb.push_bind(term.clone());
                qb.push(")");
            }
        }
    }
}

/// Free-text term of the universal search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    text: String,
    numeric_id: Option<i64>,
}

impl SearchTerm {
    /// Columns the free-text term is matched against.
    pub const COLUMNS: [&'static str; 4] = ["name", "email", "city", "country"];

    /// Parses a raw term. Blank terms are treated as absent.
    pub fn parse(raw: &str) -> Option<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }
        let numeric_id = if text.bytes().all(|b| b.is_ascii_digit()) {
            text.parse::<i64>().ok()
        } else {
            None
        };
        Some(Self {
            text: text.to_string(),
            numeric_id,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The id a purely numeric term also matches.
    pub fn numeric_id(&self) -> Option<i64> {
        self.numeric_id
    }

    fn matches(&self, record: &CustomerRecord) -> bool {
        if let Some(id) = self.numeric_id
            && record.id == Some(id)
        {
            return true;
        }
        let needle = TextMatch::Contains(self.text.clone());
        [
            record.name.as_str(),
            record.email.as_deref().unwrap_or_default(),
            record.city.as_deref().unwrap_or_default(),
            record.country.as_deref().unwrap_or_default(),
        ]
        .into_iter()
        .any(|value| !value.is_empty() && needle.matches(Some(value)))
    }

    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let pattern = like_pattern(&self.text);
        qb.push(" AND (");
        if let Some(id) = self.numeric_id {
            qb.push("id = ");
            qb.push_bind(id);
            qb.push(" OR ");
        }
        for (i, column) in Self::COLUMNS.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(format!("{column} ILIKE "));
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\'");
        }
        qb.push(")");
    }
}

/// Escapes LIKE metacharacters and wraps the term for a substring match.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Predicate over customer rows.
///
/// Every present criterion is combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerQuery {
    pub liveness: Liveness,
    pub id: Option<i64>,
    pub fitter_id: Option<i64>,
    /// Only rows with no fitter assigned.
    pub without_fitter: bool,
    pub name: Option<TextMatch>,
    pub email: Option<TextMatch>,
    pub country: Option<TextMatch>,
    pub city: Option<TextMatch>,
    pub search: Option<SearchTerm>,
}

impl CustomerQuery {
    /// Creates a query over live rows.
    pub fn live() -> Self {
        Self::default()
    }

    /// Compiles the fixed listing filters.
    ///
    /// Without `is_active` the query sees deleted rows too.
    pub fn from_filters(filters: &CustomerFilters) -> Self {
        let liveness = match filters.is_active {
            Some(true) => Liveness::Live,
            Some(false) => Liveness::Deleted,
            None => Liveness::Any,
        };
        Self {
            liveness,
            fitter_id: filters.fitter_id.map(|id| id.as_i64()),
            country: non_blank(filters.country.as_deref()).map(TextMatch::Contains),
            city: non_blank(filters.city.as_deref()).map(TextMatch::Contains),
            ..Self::default()
        }
    }

    /// Compiles the universal search. Deleted rows are never visible.
    pub fn from_search(search: &CustomerSearch) -> Self {
        Self {
            liveness: Liveness::Live,
            id: search.id,
            fitter_id: search.fitter_id.map(|id| id.as_i64()),
            name: non_blank(search.name.as_deref()).map(TextMatch::Contains),
            email: non_blank(search.email.as_deref()).map(TextMatch::Contains),
            country: non_blank(search.country.as_deref()).map(TextMatch::Contains),
            city: non_blank(search.city.as_deref()).map(TextMatch::Contains),
            search: search.search.as_deref().and_then(SearchTerm::parse),
            without_fitter: false,
        }
    }

    pub fn liveness(mut self, liveness: Liveness) -> Self {
        self.liveness = liveness;
        self
    }

    pub fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn fitter_id(mut self, fitter_id: i64) -> Self {
        self.fitter_id = Some(fitter_id);
        self
    }

    pub fn without_fitter(mut self) -> Self {
        self.without_fitter = true;
        self
    }

    pub fn country_equals(mut self, country: impl Into<String>) -> Self {
        self.country = Some(TextMatch::Equals(country.into()));
        self
    }

    pub fn city_equals(mut self, city: impl Into<String>) -> Self {
        self.city = Some(TextMatch::Equals(city.into()));
        self
    }

    /// Evaluates the predicate against a record.
    pub fn matches(&self, record: &CustomerRecord) -> bool {
        let liveness_ok = match self.liveness {
            Liveness::Live => !record.is_deleted(),
            Liveness::Deleted => record.is_deleted(),
            Liveness::Any => true,
        };
        if !liveness_ok {
            return false;
        }
        if let Some(id) = self.id
            && record.id != Some(id)
        {
            return false;
        }
        if let Some(fitter_id) = self.fitter_id
            && record.fitter_id != Some(fitter_id)
        {
            return false;
        }
        if self.without_fitter && record.fitter_id.is_some_and(|id| id > 0) {
            return false;
        }

        let text_filters = [
            (&self.name, Some(record.name.as_str())),
            (&self.email, record.email.as_deref()),
            (&self.country, record.country.as_deref()),
            (&self.city, record.city.as_deref()),
        ];
        for (filter, value) in text_filters {
            if let Some(filter) = filter
                && !filter.matches(value)
            {
                return false;
            }
        }

        match &self.search {
            Some(term) => term.matches(record),
            None => true,
        }
    }

    /// Appends the WHERE clause for this predicate.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE 1=1");

        match self.liveness {
            Liveness::Live => {
                qb.push(" AND deleted IS NOT TRUE");
            }
            Liveness::Deleted => {
                qb.push(" AND deleted IS TRUE");
            }
            Liveness::Any => {}
        }
        if let Some(id) = self.id {
            qb.push(" AND id = ");
            qb.push_bind(id);
        }
        if let Some(fitter_id) = self.fitter_id {
            qb.push(" AND fitter_id = ");
            qb.push_bind(fitter_id);
        }
        if self.without_fitter {
            qb.push(" AND COALESCE(fitter_id, 0) <= 0");
        }

        let text_filters = [
            ("name", &self.name),
            ("email", &self.email),
            ("country", &self.country),
            ("city", &self.city),
        ];
        for (column, filter) in text_filters {
            if let Some(filter) = filter {
                filter.push_sql(column, qb);
            }
        }

        if let Some(term) = &self.search {
            term.push_sql(qb);
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Page window in store terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u32,
    pub offset: u64,
}

impl From<PageRequest> for Window {
    fn from(page: PageRequest) -> Self {
        let page = page.normalized();
        Self {
            limit: page.limit,
            offset: page.offset(),
        }
    }
}
