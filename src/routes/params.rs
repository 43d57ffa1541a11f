use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub page: Option<i64>,
    #[serde(alias = "per_page")]
    pub limit: Option<i64>,
}

impl Pagination {
    /// Deepest page served; keeps the offset far from `i64` overflow.
    pub const MAX_PAGE: i64 = 1_000_000;
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    pub fn normalize(&self) -> (i64, i64, i64) {
        self.normalize_with(20)
    }

    /// Returns `(page, per_page, offset)`, clamping to sane bounds.
    pub fn normalize_with(&self, default_limit: i64) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, Self::MAX_PAGE);
        let per_page = self.limit.unwrap_or(default_limit).clamp(1, Self::MAX_LIMIT);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    #[serde(alias = "createdAt")]
    CreatedAt,
    Price,
    Name,
    Rating,
}

// Query strings are parsed flat: serde_urlencoded can't read numbers through
// `#[serde(flatten)]`, so pagination fields are repeated here.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub page: Option<i64>,
    #[serde(alias = "per_page")]
    pub limit: Option<i64>,
    #[serde(alias = "q")]
    pub search: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    #[serde(alias = "fragranceType")]
    pub fragrance_type: Option<String>,
    #[serde(alias = "isFeatured")]
    pub is_featured: Option<bool>,
    #[serde(alias = "minPrice")]
    pub min_price: Option<i64>,
    #[serde(alias = "maxPrice")]
    pub max_price: Option<i64>,
    #[serde(alias = "sortBy")]
    pub sort_by: Option<ProductSortBy>,
    #[serde(alias = "sort_order")]
    pub order: Option<SortOrder>,
}

impl ProductQuery {
    pub const DEFAULT_LIMIT: i64 = 10;

    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
        }
    }

    /// Newest first unless a sort field is named; a named field sorts ascending by default.
    pub fn sorting(&self) -> (ProductSortBy, SortOrder) {
        match self.sort_by {
            Some(sort_by) => (sort_by, self.order.unwrap_or(SortOrder::Asc)),
            None => (ProductSortBy::CreatedAt, self.order.unwrap_or(SortOrder::Desc)),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    #[serde(alias = "per_page")]
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::Uri};

    #[test]
    fn pagination_clamps_bounds() {
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
        assert_eq!(Pagination::new(0, 500).normalize(), (1, 100, 0));
        assert_eq!(Pagination::new(3, 10).normalize(), (3, 10, 20));
        assert_eq!(Pagination::default().normalize_with(10), (1, 10, 0));
    }

    #[test]
    fn huge_page_numbers_are_capped() {
        let (page, per_page, offset) = Pagination::new(i64::MAX, i64::MAX).normalize();
        assert_eq!(page, Pagination::MAX_PAGE);
        assert_eq!(per_page, Pagination::MAX_LIMIT);
        assert_eq!(offset, (Pagination::MAX_PAGE - 1) * Pagination::MAX_LIMIT);

        let (page, _, offset) = Pagination::new(i64::MIN, 10).normalize();
        assert_eq!((page, offset), (1, 0));
    }

    #[test]
    fn product_query_parses_from_a_query_string() {
        let uri: Uri = "/products?search=oud&brand=Dior&min_price=100&is_featured=true&sort_by=price&order=desc&page=2&limit=5"
            .parse()
            .unwrap();
        let Query(query) = Query::<ProductQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.search.as_deref(), Some("oud"));
        assert_eq!(query.min_price, Some(100));
        assert_eq!(query.is_featured, Some(true));
        assert!(matches!(query.sort_by, Some(ProductSortBy::Price)));
        assert!(matches!(query.order, Some(SortOrder::Desc)));
        assert_eq!(query.pagination().normalize_with(10), (2, 5, 5));
    }

    #[test]
    fn product_query_accepts_camel_case_names() {
        let uri: Uri = "/products?fragranceType=Woody&minPrice=5&sortBy=rating"
            .parse()
            .unwrap();
        let Query(query) = Query::<ProductQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.fragrance_type.as_deref(), Some("Woody"));
        assert_eq!(query.min_price, Some(5));
        assert!(matches!(query.sorting(), (ProductSortBy::Rating, SortOrder::Asc)));
    }

    #[test]
    fn default_product_sort_is_newest_first() {
        assert!(matches!(
            ProductQuery::default().sorting(),
            (ProductSortBy::CreatedAt, SortOrder::Desc)
        ));
    }
}
