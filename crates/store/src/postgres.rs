use async_trait::async_trait;
use common::{CustomerOrderId, ProductId, ResellerId, SupplierOrderId, Version};
use domain::{
    CustomerOrder, CustomerOrderStatus, Product, Reseller, SupplierOrder, SupplierOrderStatus,
};
use serde::de::DeserializeOwned;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use crate::{
    Result, StoreError,
    store::{
        CustomerOrderStore, Page, PageRequest, ProductStore, ResellerStore, SupplierOrderStore,
    },
};

const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL-backed store implementation.
///
/// Each row keeps the serialized entity in a `data` JSONB column next to the
/// columns used for filtering and ordering, plus the version counter.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    fn decode<T: DeserializeOwned>(row: &PgRow) -> Result<(T, Version)> {
        let data: serde_json::Value = row.try_get("data")?;
        let version: i64 = row.try_get("version")?;
        let entity = serde_json::from_value(data)
            .map_err(|e| StoreError::Decode(format!("invalid stored entity: {e}")))?;
        Ok((entity, Version::new(version)))
    }

    fn decode_reseller(row: PgRow) -> Result<Reseller> {
        let (mut reseller, version): (Reseller, Version) = Self::decode(&row)?;
        reseller.version = version;
        Ok(reseller)
    }

    fn decode_product(row: PgRow) -> Result<Product> {
        let (mut product, version): (Product, Version) = Self::decode(&row)?;
        product.version = version;
        Ok(product)
    }

    fn decode_customer_order(row: PgRow) -> Result<CustomerOrder> {
        let (mut order, version): (CustomerOrder, Version) = Self::decode(&row)?;
        order.set_version(version);
        Ok(order)
    }

    fn decode_supplier_order(row: PgRow) -> Result<SupplierOrder> {
        let (mut order, version): (SupplierOrder, Version) = Self::decode(&row)?;
        order.set_version(version);
        Ok(order)
    }

    fn map_insert_error(e: sqlx::Error, entity: &'static str, id: impl ToString) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
        {
            return StoreError::already_exists(entity, id);
        }
        StoreError::Database(e)
    }

    async fn stored_version(
        conn: &mut PgConnection,
        table: &'static str,
        id: uuid::Uuid,
    ) -> Result<Option<Version>> {
        let sql = format!("SELECT version FROM {table} WHERE id = $1");
        let version: Option<i64> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(version.map(Version::new))
    }

    async fn write_customer_order(
        conn: &mut PgConnection,
        order: &CustomerOrder,
    ) -> Result<Version> {
        let next = order.version().next();
        let mut stored = order.clone();
        stored.set_version(next);
        let data = serde_json::to_value(&stored)?;

        let result = sqlx::query(
            r#"
            UPDATE customer_orders
            SET status = $3, total_quantity = $4, total_amount = $5, data = $6,
                version = $7, updated_at = $8
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.version().as_i64())
        .bind(order.status().as_str())
        .bind(i64::from(order.total_quantity()))
        .bind(order.total_amount().cents())
        .bind(data)
        .bind(next.as_i64())
        .bind(order.updated_at())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(
                match Self::stored_version(conn, "customer_orders", order.id().as_uuid()).await? {
                    Some(actual) => {
                        tracing::warn!(order_id = %order.id(), "stale customer order write rejected");
                        StoreError::conflict("customer order", order.id(), order.version(), actual)
                    }
                    None => StoreError::not_found("Customer order", order.id()),
                },
            );
        }
        Ok(next)
    }

    async fn count(&self, sql: &str, reseller_id: Option<ResellerId>) -> Result<u64> {
        let mut query = sqlx::query_scalar::<_, i64>(sql);
        if let Some(id) = reseller_id {
            query = query.bind(id.as_uuid());
        }
        let count = query.fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl ResellerStore for PostgresStore {
    async fn get_reseller(&self, id: ResellerId) -> Result<Option<Reseller>> {
        let row = sqlx::query("SELECT data, version FROM resellers WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::decode_reseller).transpose()
    }

    async fn find_reseller_by_document(&self, document: &str) -> Result<Option<Reseller>> {
        let row = sqlx::query(
            "SELECT data, version FROM resellers WHERE document = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(document)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::decode_reseller).transpose()
    }

    async fn list_resellers(&self, page: PageRequest) -> Result<Page<Reseller>> {
        let total = self.count("SELECT COUNT(*) FROM resellers", None).await?;

        let rows = sqlx::query(
            r#"
            SELECT data, version FROM resellers
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::decode_reseller)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total, page))
    }

    async fn create_reseller(&self, reseller: &Reseller) -> Result<Version> {
        let mut stored = reseller.clone();
        stored.version = Version::first();
        let data = serde_json::to_value(&stored)?;

        sqlx::query(
            r#"
            INSERT INTO resellers (id, document, active, data, version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(reseller.id.as_uuid())
        .bind(&reseller.document)
        .bind(reseller.active)
        .bind(data)
        .bind(Version::first().as_i64())
        .bind(reseller.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_insert_error(e, "Reseller", reseller.id))?;

        Ok(Version::first())
    }

    async fn update_reseller(&self, reseller: &Reseller) -> Result<Version> {
        let next = reseller.version.next();
        let mut stored = reseller.clone();
        stored.version = next;
        let data = serde_json::to_value(&stored)?;

        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE resellers
            SET document = $3, active = $4, data = $5, version = $6
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(reseller.id.as_uuid())
        .bind(reseller.version.as_i64())
        .bind(&reseller.document)
        .bind(reseller.active)
        .bind(data)
        .bind(next.as_i64())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(
                match Self::stored_version(&mut *conn, "resellers", reseller.id.as_uuid()).await? {
                    Some(actual) => {
                        tracing::warn!(reseller_id = %reseller.id, "stale reseller write rejected");
                        StoreError::conflict("reseller", reseller.id, reseller.version, actual)
                    }
                    None => StoreError::not_found("Reseller", reseller.id),
                },
            );
        }
        Ok(next)
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT data, version FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::decode_product).transpose()
    }

    async fn list_products(&self, page: PageRequest) -> Result<Page<Product>> {
        let total = self.count("SELECT COUNT(*) FROM products", None).await?;

        let rows = sqlx::query(
            r#"
            SELECT data, version FROM products
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::decode_product)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total, page))
    }

    async fn products_by_brand(&self, brand: &str) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT data, version FROM products
            WHERE active AND data->>'brand' = $1
            ORDER BY data->>'name'
            "#,
        )
        .bind(brand)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::decode_product).collect()
    }

    async fn create_product(&self, product: &Product) -> Result<Version> {
        let mut stored = product.clone();
        stored.version = Version::first();
        let data = serde_json::to_value(&stored)?;

        sqlx::query(
            r#"
            INSERT INTO products (id, active, data, version, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.active)
        .bind(data)
        .bind(Version::first().as_i64())
        .bind(product.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_insert_error(e, "Product", product.id))?;

        Ok(Version::first())
    }
}

#[async_trait]
impl CustomerOrderStore for PostgresStore {
    async fn get_customer_order(&self, id: CustomerOrderId) -> Result<Option<CustomerOrder>> {
        let row = sqlx::query("SELECT data, version FROM customer_orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::decode_customer_order).transpose()
    }

    async fn list_customer_orders(&self, page: PageRequest) -> Result<Page<CustomerOrder>> {
        let total = self
            .count("SELECT COUNT(*) FROM customer_orders", None)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT data, version FROM customer_orders
            ORDER BY created_at DESC, order_number DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::decode_customer_order)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total, page))
    }

    async fn list_customer_orders_by_reseller(
        &self,
        reseller_id: ResellerId,
        page: PageRequest,
    ) -> Result<Page<CustomerOrder>> {
        let total = self
            .count(
                "SELECT COUNT(*) FROM customer_orders WHERE reseller_id = $1",
                Some(reseller_id),
            )
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT data, version FROM customer_orders
            WHERE reseller_id = $1
            ORDER BY created_at DESC, order_number DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(reseller_id.as_uuid())
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::decode_customer_order)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total, page))
    }

    async fn pending_customer_orders_by_reseller(
        &self,
        reseller_id: ResellerId,
    ) -> Result<Vec<CustomerOrder>> {
        let rows = sqlx::query(
            r#"
            SELECT data, version FROM customer_orders
            WHERE reseller_id = $1 AND status = $2
            ORDER BY created_at ASC, order_number ASC
            "#,
        )
        .bind(reseller_id.as_uuid())
        .bind(CustomerOrderStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::decode_customer_order).collect()
    }

    async fn create_customer_order(&self, order: &CustomerOrder) -> Result<Version> {
        let mut stored = order.clone();
        stored.set_version(Version::first());
        let data = serde_json::to_value(&stored)?;

        sqlx::query(
            r#"
            INSERT INTO customer_orders
                (id, reseller_id, order_number, status, total_quantity, total_amount,
                 data, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.reseller_id().as_uuid())
        .bind(order.order_number())
        .bind(order.status().as_str())
        .bind(i64::from(order.total_quantity()))
        .bind(order.total_amount().cents())
        .bind(data)
        .bind(Version::first().as_i64())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_insert_error(e, "Customer order", order.id()))?;

        Ok(Version::first())
    }

    async fn update_customer_order(&self, order: &CustomerOrder) -> Result<Version> {
        let mut conn = self.pool.acquire().await?;
        Self::write_customer_order(&mut *conn, order).await
    }

    async fn next_customer_order_number(&self) -> Result<i64> {
        let number = sqlx::query_scalar("SELECT nextval('customer_order_number_seq')")
            .fetch_one(&self.pool)
            .await?;
        Ok(number)
    }
}

#[async_trait]
impl SupplierOrderStore for PostgresStore {
    async fn get_supplier_order(&self, id: SupplierOrderId) -> Result<Option<SupplierOrder>> {
        let row = sqlx::query("SELECT data, version FROM supplier_orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::decode_supplier_order).transpose()
    }

    async fn list_supplier_orders(&self, page: PageRequest) -> Result<Page<SupplierOrder>> {
        let total = self
            .count("SELECT COUNT(*) FROM supplier_orders", None)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT data, version FROM supplier_orders
            ORDER BY created_at DESC, order_number DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::decode_supplier_order)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total, page))
    }

    async fn list_supplier_orders_by_reseller(
        &self,
        reseller_id: ResellerId,
        page: PageRequest,
    ) -> Result<Page<SupplierOrder>> {
        let total = self
            .count(
                "SELECT COUNT(*) FROM supplier_orders WHERE reseller_id = $1",
                Some(reseller_id),
            )
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT data, version FROM supplier_orders
            WHERE reseller_id = $1
            ORDER BY created_at DESC, order_number DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(reseller_id.as_uuid())
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::decode_supplier_order)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total, page))
    }

    async fn commit_consolidation(
        &self,
        supplier_order: &SupplierOrder,
        customer_orders: &[CustomerOrder],
    ) -> Result<Version> {
        let mut stored = supplier_order.clone();
        stored.set_version(Version::first());
        let data = serde_json::to_value(&stored)?;
        let customer_order_ids = serde_json::to_value(supplier_order.customer_order_ids())?;

        let mut tx = self.pool.begin().await?;

        for order in customer_orders {
            Self::write_customer_order(&mut *tx, order).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO supplier_orders
                (id, reseller_id, order_number, supplier_order_number, status, retry_count,
                 total_quantity, total_amount, customer_order_ids, data, version,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(supplier_order.id().as_uuid())
        .bind(supplier_order.reseller_id().as_uuid())
        .bind(supplier_order.order_number())
        .bind(supplier_order.supplier_order_number())
        .bind(supplier_order.status().as_str())
        .bind(i64::from(supplier_order.retry_count()))
        .bind(i64::from(supplier_order.total_quantity()))
        .bind(supplier_order.total_amount().cents())
        .bind(customer_order_ids)
        .bind(data)
        .bind(Version::first().as_i64())
        .bind(supplier_order.created_at())
        .bind(supplier_order.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::map_insert_error(e, "Supplier order", supplier_order.id()))?;

        tx.commit().await?;
        tracing::debug!(
            supplier_order_id = %supplier_order.id(),
            customer_orders = customer_orders.len(),
            "committed consolidation"
        );
        Ok(Version::first())
    }

    async fn update_supplier_order(&self, order: &SupplierOrder) -> Result<Version> {
        let next = order.version().next();
        let mut stored = order.clone();
        stored.set_version(next);
        let data = serde_json::to_value(&stored)?;

        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE supplier_orders
            SET supplier_order_number = $3, status = $4, retry_count = $5, data = $6,
                version = $7, updated_at = $8
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.version().as_i64())
        .bind(order.supplier_order_number())
        .bind(order.status().as_str())
        .bind(i64::from(order.retry_count()))
        .bind(data)
        .bind(next.as_i64())
        .bind(order.updated_at())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(
                match Self::stored_version(&mut *conn, "supplier_orders", order.id().as_uuid())
                    .await?
                {
                    Some(actual) => {
                        tracing::warn!(order_id = %order.id(), "stale supplier order write rejected");
                        StoreError::conflict("supplier order", order.id(), order.version(), actual)
                    }
                    None => StoreError::not_found("Supplier order", order.id()),
                },
            );
        }
        Ok(next)
    }

    async fn pending_supplier_orders(&self) -> Result<Vec<SupplierOrder>> {
        let rows = sqlx::query(
            r#"
            SELECT data, version FROM supplier_orders
            WHERE status = $1 OR status = $2
            ORDER BY created_at ASC, order_number ASC
            "#,
        )
        .bind(SupplierOrderStatus::Pending.as_str())
        .bind(SupplierOrderStatus::Failed.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::decode_supplier_order).collect()
    }

    async fn failed_supplier_orders(&self) -> Result<Vec<SupplierOrder>> {
        let rows = sqlx::query(
            r#"
            SELECT data, version FROM supplier_orders
            WHERE status = $1
            ORDER BY updated_at DESC, order_number DESC
            "#,
        )
        .bind(SupplierOrderStatus::Failed.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::decode_supplier_order).collect()
    }

    async fn next_supplier_order_number(&self) -> Result<i64> {
        let number = sqlx::query_scalar("SELECT nextval('supplier_order_number_seq')")
            .fetch_one(&self.pool)
            .await?;
        Ok(number)
    }
}
