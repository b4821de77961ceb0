//! Postgres-backed catalog store.
//!
//! ## Transactions
//!
//! Product create and update each run in one transaction: the product row and
//! its `product_tag` rows commit together or not at all. A transaction that
//! returns early through `?` is rolled back when it is dropped.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Constraint` |
//! | Database (foreign key violation) | `23503` | `Constraint` |
//! | Database (check constraint violation) | `23514` | `Constraint` |
//! | Database (not-null violation) | `23502` | `Constraint` |
//! | Database (other) | Any other | `Backend` |
//! | RowNotFound | N/A | `NotFound` |
//! | Other | N/A | `Backend` |

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgConnection, PgPool, Row};
use tracing::{debug, instrument};

use storefront_catalog::{
    reconcile_associations, Category, CategoryDetail, CategoryName, NewProduct, Product,
    ProductChanges, ProductDetail, ProductTag, ProductUpdateOutcome, Tag, TagDetail, TagName,
};
use storefront_core::{CategoryId, ProductId, ProductTagId, TagId};

use super::{CatalogStore, StoreError, StoreResult};

/// Idempotent DDL for the catalog tables.
pub const SCHEMA: &str = include_str!("../../migrations/0001_catalog.sql");

const PRODUCT_WITH_CATEGORY: &str = r#"
    SELECT
        p.id,
        p.product_name,
        p.price,
        p.stock,
        p.category_id,
        c.category_name
    FROM product p
    LEFT JOIN category c ON c.id = p.category_id
"#;

/// Postgres-backed catalog store.
///
/// Uses the SQLx connection pool, which is `Send + Sync` and can be shared
/// across request handlers.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the catalog tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn apply_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("apply_schema", e))?;
        Ok(())
    }

    async fn acquire(&self) -> StoreResult<sqlx::pool::PoolConnection<sqlx::Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self), err)]
    async fn list_products(&self) -> StoreResult<Vec<ProductDetail>> {
        let mut conn = self.acquire().await?;

        let rows = sqlx::query(&format!("{PRODUCT_WITH_CATEGORY} ORDER BY p.id"))
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        let mut tags = tags_by_product(&mut conn, None).await?;
        rows.iter()
            .map(|row| {
                let (product, category) = product_with_category(row)?;
                let tags = tags.remove(&product.id).unwrap_or_default();
                Ok(ProductDetail {
                    product,
                    category,
                    tags,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<ProductDetail>> {
        let mut conn = self.acquire().await?;
        fetch_product_detail(&mut conn, id).await
    }

    #[instrument(skip(self, input), fields(tag_count = input.tag_ids().len()), err)]
    async fn create_product(&self, input: NewProduct) -> StoreResult<ProductDetail> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            r#"
            INSERT INTO product (product_name, price, stock, category_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(input.product_name())
        .bind(input.price())
        .bind(input.stock())
        .bind(input.category_id().map(i64::from))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        let id = ProductId::new(
            row.try_get("id")
                .map_err(|e| map_sqlx_error("insert_product", e))?,
        );

        insert_associations(&mut *tx, id, input.tag_ids()).await?;

        let detail = fetch_product_detail(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        debug!(product_id = %id, "created product");
        Ok(detail)
    }

    #[instrument(skip(self, changes), fields(product_id = %id), err)]
    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> StoreResult<ProductUpdateOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Lock the product row so concurrent updates to the same product
        // serialize their read-diff-write.
        let row = sqlx::query(
            "SELECT id, product_name, price, stock, category_id FROM product WHERE id = $1 FOR UPDATE",
        )
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_product", e))?
        .ok_or(StoreError::NotFound)?;

        let mut product: Product = ProductRow::from_row(&row)
            .map_err(|e| map_sqlx_error("lock_product", e))?
            .into();
        changes.apply_to(&mut product);

        sqlx::query(
            r#"
            UPDATE product
            SET product_name = $2, price = $3, stock = $4, category_id = $5
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .bind(&product.product_name)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.category_id.map(i64::from))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        let existing = sqlx::query(
            "SELECT id, product_id, tag_id FROM product_tag WHERE product_id = $1",
        )
        .bind(id.get())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("load_product_tags", e))?
        .iter()
        .map(|row| ProductTagRow::from_row(row).map(ProductTag::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| map_sqlx_error("load_product_tags", e))?;

        let diff = reconcile_associations(&existing, changes.tag_ids());

        if !diff.to_remove.is_empty() {
            let ids: Vec<i64> = diff.to_remove.iter().map(|row| row.id.get()).collect();
            sqlx::query("DELETE FROM product_tag WHERE id = ANY($1)")
                .bind(ids)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("delete_product_tags", e))?;
        }
        let created = insert_associations(&mut *tx, id, &diff.to_create).await?;

        let detail = fetch_product_detail(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        debug!(
            created = created.len(),
            removed = diff.to_remove.len(),
            "reconciled product tags"
        );

        Ok(ProductUpdateOutcome {
            product: detail,
            created,
            removed: diff.to_remove,
        })
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), err)]
    async fn list_categories(&self) -> StoreResult<Vec<CategoryDetail>> {
        let mut conn = self.acquire().await?;

        let categories = sqlx::query("SELECT id, category_name FROM category ORDER BY id")
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;

        let mut products = products_by_category(&mut conn, None).await?;
        categories
            .iter()
            .map(|row| {
                let category: Category = CategoryRow::from_row(row)
                    .map_err(|e| map_sqlx_error("list_categories", e))?
                    .into();
                let products = products.remove(&category.id).unwrap_or_default();
                Ok(CategoryDetail { category, products })
            })
            .collect()
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<CategoryDetail>> {
        let mut conn = self.acquire().await?;

        let row = sqlx::query("SELECT id, category_name FROM category WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;
        let Some(row) = row else {
            return Ok(None);
        };

        let category: Category = CategoryRow::from_row(&row)
            .map_err(|e| map_sqlx_error("get_category", e))?
            .into();
        let products = products_by_category(&mut conn, Some(id))
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(Some(CategoryDetail { category, products }))
    }

    #[instrument(skip(self, name), err)]
    async fn create_category(&self, name: CategoryName) -> StoreResult<Category> {
        let row = sqlx::query(
            "INSERT INTO category (category_name) VALUES ($1) RETURNING id, category_name",
        )
        .bind(name.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;

        Ok(CategoryRow::from_row(&row)
            .map_err(|e| map_sqlx_error("insert_category", e))?
            .into())
    }

    #[instrument(skip(self, name), fields(category_id = %id), err)]
    async fn update_category(&self, id: CategoryId, name: CategoryName) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE category SET category_name = $2 WHERE id = $1")
            .bind(id.get())
            .bind(name.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_category", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn delete_category(&self, id: CategoryId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM category WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), err)]
    async fn list_tags(&self) -> StoreResult<Vec<TagDetail>> {
        let mut conn = self.acquire().await?;

        let tags = sqlx::query("SELECT id, tag_name FROM tag ORDER BY id")
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("list_tags", e))?;

        let mut products = products_by_tag(&mut conn, None).await?;
        tags.iter()
            .map(|row| {
                let tag: Tag = TagRow::from_row(row)
                    .map_err(|e| map_sqlx_error("list_tags", e))?
                    .into();
                let products = products.remove(&tag.id).unwrap_or_default();
                Ok(TagDetail { tag, products })
            })
            .collect()
    }

    #[instrument(skip(self), fields(tag_id = %id), err)]
    async fn get_tag(&self, id: TagId) -> StoreResult<Option<TagDetail>> {
        let mut conn = self.acquire().await?;

        let row = sqlx::query("SELECT id, tag_name FROM tag WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("get_tag", e))?;
        let Some(row) = row else {
            return Ok(None);
        };

        let tag: Tag = TagRow::from_row(&row)
            .map_err(|e| map_sqlx_error("get_tag", e))?
            .into();
        let products = products_by_tag(&mut conn, Some(id))
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(Some(TagDetail { tag, products }))
    }

    #[instrument(skip(self, name), err)]
    async fn create_tag(&self, name: TagName) -> StoreResult<Tag> {
        let row = sqlx::query("INSERT INTO tag (tag_name) VALUES ($1) RETURNING id, tag_name")
            .bind(name.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_tag", e))?;

        Ok(TagRow::from_row(&row)
            .map_err(|e| map_sqlx_error("insert_tag", e))?
            .into())
    }

    #[instrument(skip(self, name), fields(tag_id = %id), err)]
    async fn update_tag(&self, id: TagId, name: TagName) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE tag SET tag_name = $2 WHERE id = $1")
            .bind(id.get())
            .bind(name.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_tag", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(tag_id = %id), err)]
    async fn delete_tag(&self, id: TagId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM tag WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_tag", e))?;
        Ok(result.rows_affected())
    }
}

async fn fetch_product_detail(
    conn: &mut PgConnection,
    id: ProductId,
) -> StoreResult<Option<ProductDetail>> {
    let row = sqlx::query(&format!("{PRODUCT_WITH_CATEGORY} WHERE p.id = $1"))
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;
    let Some(row) = row else {
        return Ok(None);
    };

    let (product, category) = product_with_category(&row)?;
    let tags = tags_by_product(conn, Some(id))
        .await?
        .remove(&id)
        .unwrap_or_default();
    Ok(Some(ProductDetail {
        product,
        category,
        tags,
    }))
}

/// Bulk insert one association per tag id, returning the new rows.
async fn insert_associations(
    conn: &mut PgConnection,
    product_id: ProductId,
    tag_ids: &[TagId],
) -> StoreResult<Vec<ProductTag>> {
    if tag_ids.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<i64> = tag_ids.iter().map(|id| id.get()).collect();
    let rows = sqlx::query(
        r#"
        INSERT INTO product_tag (product_id, tag_id)
        SELECT $1, tag_id FROM UNNEST($2::BIGINT[]) AS t (tag_id)
        RETURNING id, product_id, tag_id
        "#,
    )
    .bind(product_id.get())
    .bind(ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_product_tags", e))?;

    let mut created = rows
        .iter()
        .map(|row| ProductTagRow::from_row(row).map(ProductTag::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| map_sqlx_error("insert_product_tags", e))?;
    created.sort_by_key(|row| row.id);
    Ok(created)
}

/// Tags grouped by product, optionally restricted to one product.
async fn tags_by_product(
    conn: &mut PgConnection,
    product_id: Option<ProductId>,
) -> StoreResult<HashMap<ProductId, Vec<Tag>>> {
    let rows = sqlx::query(
        r#"
        SELECT pt.product_id AS owner_id, t.id, t.tag_name
        FROM product_tag pt
        JOIN tag t ON t.id = pt.tag_id
        WHERE $1::BIGINT IS NULL OR pt.product_id = $1
        ORDER BY pt.product_id, t.id
        "#,
    )
    .bind(product_id.map(|id| id.get()))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("load_tags", e))?;

    let mut grouped: HashMap<ProductId, Vec<Tag>> = HashMap::new();
    for row in &rows {
        let owner: i64 = row
            .try_get("owner_id")
            .map_err(|e| map_sqlx_error("load_tags", e))?;
        let tag = TagRow::from_row(row).map_err(|e| map_sqlx_error("load_tags", e))?;
        grouped.entry(ProductId::new(owner)).or_default().push(tag.into());
    }
    Ok(grouped)
}

/// Products grouped by category, optionally restricted to one category.
async fn products_by_category(
    conn: &mut PgConnection,
    category_id: Option<CategoryId>,
) -> StoreResult<HashMap<CategoryId, Vec<Product>>> {
    let rows = sqlx::query(
        r#"
        SELECT id, product_name, price, stock, category_id
        FROM product
        WHERE category_id IS NOT NULL AND ($1::BIGINT IS NULL OR category_id = $1)
        ORDER BY id
        "#,
    )
    .bind(category_id.map(|id| id.get()))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("load_category_products", e))?;

    let mut grouped: HashMap<CategoryId, Vec<Product>> = HashMap::new();
    for row in &rows {
        let product: Product = ProductRow::from_row(row)
            .map_err(|e| map_sqlx_error("load_category_products", e))?
            .into();
        if let Some(category_id) = product.category_id {
            grouped.entry(category_id).or_default().push(product);
        }
    }
    Ok(grouped)
}

/// Products grouped by tag, optionally restricted to one tag.
async fn products_by_tag(
    conn: &mut PgConnection,
    tag_id: Option<TagId>,
) -> StoreResult<HashMap<TagId, Vec<Product>>> {
    let rows = sqlx::query(
        r#"
        SELECT pt.tag_id AS owner_id, p.id, p.product_name, p.price, p.stock, p.category_id
        FROM product_tag pt
        JOIN product p ON p.id = pt.product_id
        WHERE $1::BIGINT IS NULL OR pt.tag_id = $1
        ORDER BY pt.tag_id, p.id
        "#,
    )
    .bind(tag_id.map(|id| id.get()))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("load_tag_products", e))?;

    let mut grouped: HashMap<TagId, Vec<Product>> = HashMap::new();
    for row in &rows {
        let owner: i64 = row
            .try_get("owner_id")
            .map_err(|e| map_sqlx_error("load_tag_products", e))?;
        let product = ProductRow::from_row(row)
            .map_err(|e| map_sqlx_error("load_tag_products", e))?;
        grouped.entry(TagId::new(owner)).or_default().push(product.into());
    }
    Ok(grouped)
}

fn product_with_category(row: &PgRow) -> StoreResult<(Product, Option<Category>)> {
    let product: Product = ProductRow::from_row(row)
        .map_err(|e| map_sqlx_error("decode_product", e))?
        .into();
    let category_name: Option<String> = row
        .try_get("category_name")
        .map_err(|e| map_sqlx_error("decode_product", e))?;

    let category = match (product.category_id, category_name) {
        (Some(id), Some(category_name)) => Some(Category { id, category_name }),
        _ => None,
    };
    Ok((product, category))
}

/// Map SQLx errors to storage errors.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            match db_err.code().as_deref() {
                // unique, foreign key, check, not-null
                Some("23505") | Some("23503") | Some("23514") | Some("23502") => {
                    StoreError::Constraint(msg)
                }
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: i64,
    product_name: String,
    price: f64,
    stock: i32,
    category_id: Option<i64>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            product_name: row.try_get("product_name")?,
            price: row.try_get("price")?,
            stock: row.try_get("stock")?,
            category_id: row.try_get("category_id")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::new(row.id),
            product_name: row.product_name,
            price: row.price,
            stock: row.stock,
            category_id: row.category_id.map(CategoryId::new),
        }
    }
}

#[derive(Debug)]
struct CategoryRow {
    id: i64,
    category_name: String,
}

impl<'r> sqlx::FromRow<'r, PgRow> for CategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CategoryRow {
            id: row.try_get("id")?,
            category_name: row.try_get("category_name")?,
        })
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId::new(row.id),
            category_name: row.category_name,
        }
    }
}

#[derive(Debug)]
struct TagRow {
    id: i64,
    tag_name: String,
}

impl<'r> sqlx::FromRow<'r, PgRow> for TagRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TagRow {
            id: row.try_get("id")?,
            tag_name: row.try_get("tag_name")?,
        })
    }
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: TagId::new(row.id),
            tag_name: row.tag_name,
        }
    }
}

#[derive(Debug)]
struct ProductTagRow {
    id: i64,
    product_id: i64,
    tag_id: i64,
}

impl<'r> sqlx::FromRow<'r, PgRow> for ProductTagRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductTagRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            tag_id: row.try_get("tag_id")?,
        })
    }
}

impl From<ProductTagRow> for ProductTag {
    fn from(row: ProductTagRow) -> Self {
        ProductTag {
            id: ProductTagId::new(row.id),
            product_id: ProductId::new(row.product_id),
            tag_id: TagId::new(row.tag_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_declares_cascades() {
        assert!(SCHEMA.contains("REFERENCES product (id) ON DELETE CASCADE"));
        assert!(SCHEMA.contains("REFERENCES tag (id) ON DELETE CASCADE"));
        assert!(SCHEMA.contains("REFERENCES category (id) ON DELETE SET NULL"));
        assert!(SCHEMA.contains("UNIQUE (product_id, tag_id)"));
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            map_sqlx_error("get_product", sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
    }

    #[test]
    fn pool_closed_maps_to_backend() {
        match map_sqlx_error("list_products", sqlx::Error::PoolClosed) {
            StoreError::Backend(msg) => assert!(msg.contains("list_products")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Runs against a real database: `DATABASE_URL=... cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn create_update_and_rollback_against_postgres() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let store = PostgresCatalogStore::connect(&url, 2).await.unwrap();
        store.apply_schema().await.unwrap();

        let category = store
            .create_category(CategoryName::parse("Music").unwrap())
            .await
            .unwrap();
        let mut tags = Vec::new();
        for name in ["rock", "pop", "jazz", "blue"] {
            tags.push(store.create_tag(TagName::parse(name).unwrap()).await.unwrap().id);
        }

        let created = store
            .create_product(
                NewProduct::new(
                    "Vinyl",
                    12.5,
                    None,
                    Some(category.id),
                    Some(vec![tags[0], tags[1], tags[2]]),
                )
                .unwrap(),
            )
            .await
            .unwrap();
        let id = created.product.id;
        assert_eq!(created.tags.len(), 3);
        assert_eq!(created.category.map(|c| c.id), Some(category.id));

        let desired = vec![tags[1], tags[2], tags[3]];
        let changes = ProductChanges::new(None, None, None, None, Some(desired)).unwrap();
        let outcome = store.update_product(id, changes).await.unwrap();
        let created_tags: Vec<TagId> = outcome.created.iter().map(|row| row.tag_id).collect();
        let removed_tags: Vec<TagId> = outcome.removed.iter().map(|row| row.tag_id).collect();
        assert_eq!(created_tags, vec![tags[3]]);
        assert_eq!(removed_tags, vec![tags[0]]);

        // Unknown tag: foreign key violation, whole transaction rolled back.
        let missing_tag = TagId::new(i64::MAX);
        let renamed = Some("Renamed");
        let bad = ProductChanges::new(renamed, None, None, None, Some(vec![missing_tag])).unwrap();
        let err = store.update_product(id, bad).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)), "{err:?}");

        let after = store.get_product(id).await.unwrap().unwrap();
        assert_eq!(after.product.product_name, "Vinyl");
        let mut after_tags: Vec<TagId> = after.tags.iter().map(|t| t.id).collect();
        after_tags.sort();
        assert_eq!(after_tags, vec![tags[1], tags[2], tags[3]]);

        let before = store.list_products().await.unwrap().len();
        let err = store
            .create_product(
                NewProduct::new("Ghost", 1.0, None, None, Some(vec![missing_tag])).unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)), "{err:?}");
        assert_eq!(store.list_products().await.unwrap().len(), before);

        assert_eq!(store.delete_product(id).await.unwrap(), 1);
        assert_eq!(store.delete_product(id).await.unwrap(), 0);
    }
}
