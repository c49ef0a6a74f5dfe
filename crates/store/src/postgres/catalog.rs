use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::map_db_error;
use crate::{
    CatalogStore, NewProduct, PageRequest, Product, ProductId, ProductPatch, Result, StoreError,
};

const PRODUCT_COLUMNS: &str = "id, name, description, quantity_on_hand, created_at, updated_at";

/// PostgreSQL-backed catalog store.
///
/// Stock changes are single `UPDATE` statements; PostgreSQL's row lock
/// serializes concurrent decrements of the same product.
#[derive(Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    /// Creates a new PostgreSQL catalog store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let quantity: i64 = row.try_get("quantity_on_hand")?;
        let id = ProductId::from_uuid(row.try_get::<Uuid, _>("id")?);

        Ok(Product {
            id,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            quantity_on_hand: u32::try_from(quantity).map_err(|_| {
                StoreError::InvalidRecord(format!("product {id} has stock {quantity}"))
            })?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn insert(&self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (id, name, description, quantity_on_hand)
            VALUES ($1, $2, $3, $4)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&product.name)
        .bind(&product.description)
        .bind(i64::from(product.quantity_on_hand))
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Self::row_to_product(row)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            ORDER BY name ASC, id ASC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn update(&self, id: ProductId, patch: ProductPatch) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = now()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(patch.name)
        .bind(patch.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(Self::row_to_product).transpose()
    }

    async fn delete(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "DELETE FROM products WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(Self::row_to_product).transpose()
    }

    async fn fetch_by_ids(&self, ids: &BTreeSet<ProductId>) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let uuids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(uuids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn conditional_decrement(&self, id: ProductId, amount: u32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity_on_hand = quantity_on_hand - $2,
                updated_at = now()
            WHERE id = $1 AND quantity_on_hand >= $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(i64::from(amount))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn increment_back(&self, id: ProductId, amount: u32) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity_on_hand = quantity_on_hand + $2,
                updated_at = now()
            WHERE id = $1 AND quantity_on_hand + $2 <= $3
            "#,
        )
        .bind(id.as_uuid())
        .bind(i64::from(amount))
        .bind(i64::from(u32::MAX))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Nothing updated: either the product is gone or the sum would not fit.
        match self.get(id).await? {
            Some(_) => Err(StoreError::Conflict(format!(
                "stock overflow for product {id}"
            ))),
            None => Err(StoreError::NotFound {
                entity: "product",
                id: id.to_string(),
            }),
        }
    }
}
