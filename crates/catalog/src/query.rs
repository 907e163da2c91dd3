//! Product list query builder: raw parameters → validated query → filter + sort + page.

use core::cmp::Ordering;
use core::str::FromStr;

use serde::Deserialize;

use storefront_core::{CategoryId, DomainError, Page, PageRequest};

use crate::Product;

pub const MAX_SEARCH_LEN: usize = 100;

/// Raw query-string parameters, exactly as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQueryParams {
    pub search: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// Inclusive lower price bound (cents).
    pub min_price: Option<String>,
    /// Inclusive upper price bound (cents).
    pub max_price: Option<String>,
    pub in_stock: Option<String>,
    pub featured: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
}

impl ProductSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductSort::Newest => "newest",
            ProductSort::Oldest => "oldest",
            ProductSort::PriceAsc => "price_asc",
            ProductSort::PriceDesc => "price_desc",
            ProductSort::NameAsc => "name_asc",
            ProductSort::NameDesc => "name_desc",
        }
    }

    /// Total order: the sort key, then id as a tiebreaker so pages never overlap.
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let primary = match self {
            ProductSort::Newest => b.created_at.cmp(&a.created_at),
            ProductSort::Oldest => a.created_at.cmp(&b.created_at),
            ProductSort::PriceAsc => a.price_cents.cmp(&b.price_cents),
            ProductSort::PriceDesc => b.price_cents.cmp(&a.price_cents),
            ProductSort::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            ProductSort::NameDesc => b.name.to_lowercase().cmp(&a.name.to_lowercase()),
        };
        primary.then_with(|| match self {
            ProductSort::Newest | ProductSort::PriceDesc | ProductSort::NameDesc => b.id.cmp(&a.id),
            _ => a.id.cmp(&b.id),
        })
    }
}

impl FromStr for ProductSort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "name_asc" => Ok(Self::NameAsc),
            "name_desc" => Ok(Self::NameDesc),
            other => Err(DomainError::validation(format!(
                "unknown sort '{other}' (expected one of newest, oldest, price_asc, price_desc, name_asc, name_desc)"
            ))),
        }
    }
}

/// Validated list query. The category is still a slug here; the caller
/// resolves it to an id via [`ProductQuery::filter`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category_slug: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    pub sort: ProductSort,
    pub page: PageRequest,
}

impl ProductQuery {
    pub fn filter(&self, category_id: Option<CategoryId>, include_inactive: bool) -> ProductFilter {
        ProductFilter {
            search: self.search.clone(),
            category_id,
            min_price: self.min_price,
            max_price: self.max_price,
            in_stock: self.in_stock,
            featured: self.featured,
            include_inactive,
        }
    }
}

impl TryFrom<ProductQueryParams> for ProductQuery {
    type Error = DomainError;

    fn try_from(params: ProductQueryParams) -> Result<Self, Self::Error> {
        let search = non_blank(params.search);
        if let Some(s) = &search {
            if s.chars().count() > MAX_SEARCH_LEN {
                return Err(DomainError::validation(format!(
                    "search must be at most {MAX_SEARCH_LEN} characters"
                )));
            }
        }

        let min_price = parse_price("min_price", params.min_price)?;
        let max_price = parse_price("max_price", params.max_price)?;
        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err(DomainError::validation("min_price cannot exceed max_price"));
            }
        }

        let sort = match non_blank(params.sort) {
            Some(s) => s.parse()?,
            None => ProductSort::default(),
        };

        let page = parse_number::<u32>("page", params.page)?;
        let limit = parse_number::<u32>("limit", params.limit)?;

        Ok(Self {
            search,
            category_slug: non_blank(params.category).map(|s| s.to_lowercase()),
            min_price,
            max_price,
            in_stock: parse_bool("in_stock", params.in_stock)?,
            featured: parse_bool("featured", params.featured)?,
            sort,
            page: PageRequest::new(page, limit),
        })
    }
}

/// Resolved filter shared by every store implementation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring over name and description.
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    /// `Some(true)`: stock > 0; `Some(false)`: stock == 0.
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    pub include_inactive: bool,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if !self.include_inactive && !product.active {
            return false;
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let in_name = product.name.to_lowercase().contains(&term);
            let in_description = product
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term));
            if !in_name && !in_description {
                return false;
            }
        }
        if self.category_id.is_some() && product.category_id != self.category_id {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price_cents < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price_cents > max) {
            return false;
        }
        if self.in_stock.is_some_and(|want| product.in_stock() != want) {
            return false;
        }
        if self.featured.is_some_and(|want| product.featured != want) {
            return false;
        }
        true
    }

    /// Filter, sort and slice an in-memory product set.
    pub fn select<'a>(
        &self,
        products: impl IntoIterator<Item = &'a Product>,
        sort: ProductSort,
        page: PageRequest,
    ) -> Page<Product> {
        let mut hits: Vec<&Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        hits.sort_by(|a, b| sort.compare(a, b));

        let total = hits.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = hits
            .into_iter()
            .skip(offset)
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Page::new(items, page, total)
    }
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_number<T: FromStr>(field: &str, raw: Option<String>) -> Result<Option<T>, DomainError> {
    non_blank(raw)
        .map(|s| {
            s.parse::<T>()
                .map_err(|_| DomainError::validation(format!("{field} must be a non-negative integer")))
        })
        .transpose()
}

fn parse_price(field: &str, raw: Option<String>) -> Result<Option<i64>, DomainError> {
    match parse_number::<i64>(field, raw)? {
        Some(v) if v < 0 => Err(DomainError::validation(format!("{field} cannot be negative"))),
        other => Ok(other),
    }
}

fn parse_bool(field: &str, raw: Option<String>) -> Result<Option<bool>, DomainError> {
    non_blank(raw)
        .map(|s| match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(DomainError::validation(format!("{field} must be true or false"))),
        })
        .transpose()
}
