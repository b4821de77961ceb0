use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::{debug, instrument};

use storefront_catalog::{
    reconcile_associations, Category, CategoryDetail, CategoryName, NewProduct, Product,
    ProductChanges, ProductDetail, ProductTag, ProductUpdateOutcome, Tag, TagDetail, TagName,
};
use storefront_core::{CategoryId, ProductId, ProductTagId, TagId};

use super::{CatalogStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    categories: BTreeMap<CategoryId, Category>,
    tags: BTreeMap<TagId, Tag>,
    product_tags: BTreeMap<ProductTagId, ProductTag>,
    last_product_id: i64,
    last_category_id: i64,
    last_tag_id: i64,
    last_product_tag_id: i64,
}

impl Tables {
    fn ensure_category(&self, id: Option<CategoryId>) -> StoreResult<()> {
        match id {
            Some(id) if !self.categories.contains_key(&id) => Err(StoreError::Constraint(
                format!("product.category_id references missing category {id}"),
            )),
            _ => Ok(()),
        }
    }

    fn ensure_tags(&self, ids: &[TagId]) -> StoreResult<()> {
        match ids.iter().find(|id| !self.tags.contains_key(id)) {
            Some(id) => Err(StoreError::Constraint(format!(
                "product_tag.tag_id references missing tag {id}"
            ))),
            None => Ok(()),
        }
    }

    fn associations_of(&self, product_id: ProductId) -> Vec<ProductTag> {
        self.product_tags
            .values()
            .filter(|row| row.product_id == product_id)
            .copied()
            .collect()
    }

    fn insert_association(&mut self, product_id: ProductId, tag_id: TagId) -> ProductTag {
        self.last_product_tag_id += 1;
        let row = ProductTag {
            id: ProductTagId::new(self.last_product_tag_id),
            product_id,
            tag_id,
        };
        self.product_tags.insert(row.id, row);
        row
    }

    fn product_detail(&self, product: &Product) -> ProductDetail {
        let category = product
            .category_id
            .and_then(|id| self.categories.get(&id))
            .cloned();

        let mut tags: Vec<Tag> = self
            .associations_of(product.id)
            .iter()
            .filter_map(|row| self.tags.get(&row.tag_id))
            .cloned()
            .collect();
        tags.sort_by_key(|t| t.id);

        ProductDetail {
            product: product.clone(),
            category,
            tags,
        }
    }

    fn category_detail(&self, category: &Category) -> CategoryDetail {
        let products = self
            .products
            .values()
            .filter(|p| p.category_id == Some(category.id))
            .cloned()
            .collect();

        CategoryDetail {
            category: category.clone(),
            products,
        }
    }

    fn tag_detail(&self, tag: &Tag) -> TagDetail {
        let mut products: Vec<Product> = self
            .product_tags
            .values()
            .filter(|row| row.tag_id == tag.id)
            .filter_map(|row| self.products.get(&row.product_id))
            .cloned()
            .collect();
        products.sort_by_key(|p| p.id);

        TagDetail {
            tag: tag.clone(),
            products,
        }
    }
}

/// In-memory catalog store.
///
/// Intended for tests/dev. A single lock guards every table and each write
/// holds the write lock for its whole check-then-mutate sequence, so writes
/// are all-or-nothing just like a database transaction. Foreign key and
/// cascade rules mirror the Postgres schema.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    inner: RwLock<Tables>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn list_products(&self) -> StoreResult<Vec<ProductDetail>> {
        let tables = self.read()?;
        Ok(tables
            .products
            .values()
            .map(|p| tables.product_detail(p))
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<ProductDetail>> {
        let tables = self.read()?;
        Ok(tables.products.get(&id).map(|p| tables.product_detail(p)))
    }

    #[instrument(skip(self, input), fields(tag_count = input.tag_ids().len()), err)]
    async fn create_product(&self, input: NewProduct) -> StoreResult<ProductDetail> {
        let mut tables = self.write()?;

        // Check every reference before touching anything.
        tables.ensure_category(input.category_id())?;
        tables.ensure_tags(input.tag_ids())?;

        tables.last_product_id += 1;
        let id = ProductId::new(tables.last_product_id);
        let tag_ids = input.tag_ids().to_vec();
        let product = input.into_product(id);
        tables.products.insert(id, product.clone());

        for tag_id in tag_ids {
            tables.insert_association(id, tag_id);
        }

        debug!(product_id = %id, "created product");
        Ok(tables.product_detail(&product))
    }

    #[instrument(skip(self, changes), fields(product_id = %id), err)]
    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> StoreResult<ProductUpdateOutcome> {
        let mut tables = self.write()?;

        let mut product = tables.products.get(&id).cloned().ok_or(StoreError::NotFound)?;
        tables.ensure_category(changes.category_id())?;

        let existing = tables.associations_of(id);
        let diff = reconcile_associations(&existing, changes.tag_ids());
        tables.ensure_tags(&diff.to_create)?;

        changes.apply_to(&mut product);
        tables.products.insert(id, product.clone());

        for row in &diff.to_remove {
            tables.product_tags.remove(&row.id);
        }
        let created: Vec<ProductTag> = diff
            .to_create
            .iter()
            .map(|&tag_id| tables.insert_association(id, tag_id))
            .collect();

        debug!(
            created = created.len(),
            removed = diff.to_remove.len(),
            "reconciled product tags"
        );

        Ok(ProductUpdateOutcome {
            product: tables.product_detail(&product),
            created,
            removed: diff.to_remove,
        })
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<u64> {
        let mut tables = self.write()?;
        if tables.products.remove(&id).is_none() {
            return Ok(0);
        }
        tables.product_tags.retain(|_, row| row.product_id != id);
        Ok(1)
    }

    async fn list_categories(&self) -> StoreResult<Vec<CategoryDetail>> {
        let tables = self.read()?;
        Ok(tables
            .categories
            .values()
            .map(|c| tables.category_detail(c))
            .collect())
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<CategoryDetail>> {
        let tables = self.read()?;
        Ok(tables.categories.get(&id).map(|c| tables.category_detail(c)))
    }

    #[instrument(skip(self, name), err)]
    async fn create_category(&self, name: CategoryName) -> StoreResult<Category> {
        let mut tables = self.write()?;
        tables.last_category_id += 1;
        let category = Category {
            id: CategoryId::new(tables.last_category_id),
            category_name: name.into_inner(),
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    #[instrument(skip(self, name), fields(category_id = %id), err)]
    async fn update_category(&self, id: CategoryId, name: CategoryName) -> StoreResult<u64> {
        let mut tables = self.write()?;
        match tables.categories.get_mut(&id) {
            Some(category) => {
                category.category_name = name.into_inner();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn delete_category(&self, id: CategoryId) -> StoreResult<u64> {
        let mut tables = self.write()?;
        if tables.categories.remove(&id).is_none() {
            return Ok(0);
        }
        for product in tables.products.values_mut() {
            if product.category_id == Some(id) {
                product.category_id = None;
            }
        }
        Ok(1)
    }

    async fn list_tags(&self) -> StoreResult<Vec<TagDetail>> {
        let tables = self.read()?;
        Ok(tables.tags.values().map(|t| tables.tag_detail(t)).collect())
    }

    async fn get_tag(&self, id: TagId) -> StoreResult<Option<TagDetail>> {
        let tables = self.read()?;
        Ok(tables.tags.get(&id).map(|t| tables.tag_detail(t)))
    }

    #[instrument(skip(self, name), err)]
    async fn create_tag(&self, name: TagName) -> StoreResult<Tag> {
        let mut tables = self.write()?;
        tables.last_tag_id += 1;
        let tag = Tag {
            id: TagId::new(tables.last_tag_id),
            tag_name: name.into_inner(),
        };
        tables.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    #[instrument(skip(self, name), fields(tag_id = %id), err)]
    async fn update_tag(&self, id: TagId, name: TagName) -> StoreResult<u64> {
        let mut tables = self.write()?;
        match tables.tags.get_mut(&id) {
            Some(tag) => {
                tag.tag_name = name.into_inner();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    #[instrument(skip(self), fields(tag_id = %id), err)]
    async fn delete_tag(&self, id: TagId) -> StoreResult<u64> {
        let mut tables = self.write()?;
        if tables.tags.remove(&id).is_none() {
            return Ok(0);
        }
        tables.product_tags.retain(|_, row| row.tag_id != id);
        Ok(1)
    }
}
