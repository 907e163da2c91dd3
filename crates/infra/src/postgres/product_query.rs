//! `ProductFilter` → SQL. Ordering mirrors `ProductSort::compare`.

use sqlx::{Postgres, QueryBuilder};

use storefront_catalog::{ProductFilter, ProductSort};
use storefront_core::PageRequest;

pub(crate) const PRODUCT_COLUMNS: &str =
    "id, name, slug, description, price_cents, stock, category_id, image_url, featured, active, created_at, updated_at";

/// Escape LIKE metacharacters; Postgres' default escape character is `\`.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn clause(qb: &mut QueryBuilder<'static, Postgres>, first: &mut bool) {
    qb.push(if *first { " WHERE " } else { " AND " });
    *first = false;
}

fn push_where(qb: &mut QueryBuilder<'static, Postgres>, filter: &ProductFilter) {
    let mut first = true;

    if !filter.include_inactive {
        clause(qb, &mut first);
        qb.push("active = TRUE");
    }
    if let Some(term) = &filter.search {
        let pattern = format!("%{}%", escape_like(term));
        clause(qb, &mut first);
        qb.push("(name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category_id) = filter.category_id {
        clause(qb, &mut first);
        qb.push("category_id = ").push_bind(*category_id.as_uuid());
    }
    if let Some(min) = filter.min_price {
        clause(qb, &mut first);
        qb.push("price_cents >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        clause(qb, &mut first);
        qb.push("price_cents <= ").push_bind(max);
    }
    match filter.in_stock {
        Some(true) => {
            clause(qb, &mut first);
            qb.push("stock > 0");
        }
        Some(false) => {
            clause(qb, &mut first);
            qb.push("stock = 0");
        }
        None => {}
    }
    if let Some(featured) = filter.featured {
        clause(qb, &mut first);
        qb.push("featured = ").push_bind(featured);
    }
}

fn order_by(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Newest => " ORDER BY created_at DESC, id DESC",
        ProductSort::Oldest => " ORDER BY created_at ASC, id ASC",
        ProductSort::PriceAsc => " ORDER BY price_cents ASC, id ASC",
        ProductSort::PriceDesc => " ORDER BY price_cents DESC, id DESC",
        ProductSort::NameAsc => " ORDER BY LOWER(name) ASC, id ASC",
        ProductSort::NameDesc => " ORDER BY LOWER(name) DESC, id DESC",
    }
}

pub(crate) fn count_query(filter: &ProductFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM products");
    push_where(&mut qb, filter);
    qb
}

pub(crate) fn page_query(filter: &ProductFilter, sort: ProductSort, page: PageRequest) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
    push_where(&mut qb, filter);
    qb.push(order_by(sort));
    qb.push(" LIMIT ").push_bind(i64::from(page.limit()));
    qb.push(" OFFSET ")
        .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
    qb
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::CategoryId;

    #[test]
    fn default_filter_only_hides_inactive() {
        let qb = count_query(&ProductFilter::default());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM products WHERE active = TRUE");
    }

    #[test]
    fn admin_filter_without_conditions_has_no_where() {
        let filter = ProductFilter {
            include_inactive: true,
            ..Default::default()
        };
        assert_eq!(count_query(&filter).sql(), "SELECT COUNT(*) FROM products");
    }

    #[test]
    fn every_condition_is_bound() {
        let filter = ProductFilter {
            search: Some("boot".into()),
            category_id: Some(CategoryId::new()),
            min_price: Some(100),
            max_price: Some(900),
            in_stock: Some(true),
            featured: Some(false),
            include_inactive: false,
        };
        let qb = page_query(&filter, ProductSort::PriceAsc, PageRequest::new(Some(2), Some(10)));
        assert_eq!(
            qb.sql(),
            format!(
                "SELECT {PRODUCT_COLUMNS} FROM products WHERE active = TRUE \
                 AND (name ILIKE $1 OR description ILIKE $2) AND category_id = $3 \
                 AND price_cents >= $4 AND price_cents <= $5 AND stock > 0 AND featured = $6 \
                 ORDER BY price_cents ASC, id ASC LIMIT $7 OFFSET $8"
            )
        );
    }

    #[test]
    fn out_of_stock_filter_and_name_sort() {
        let filter = ProductFilter {
            in_stock: Some(false),
            include_inactive: true,
            ..Default::default()
        };
        let qb = page_query(&filter, ProductSort::NameDesc, PageRequest::default());
        assert_eq!(
            qb.sql(),
            format!(
                "SELECT {PRODUCT_COLUMNS} FROM products WHERE stock = 0 \
                 ORDER BY LOWER(name) DESC, id DESC LIMIT $1 OFFSET $2"
            )
        );
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
