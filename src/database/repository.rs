use serde_json::json;
use sqlx::{self, postgres::PgRow, FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::query_builder::QueryBuilder;
use crate::filter::FilterData;

/// Filter-driven reads over a single table, decoding rows into `T`
pub struct Repository<T> {
    table_name: String,
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(table_name: impl Into<String>, pool: PgPool) -> Self {
        Self {
            table_name: table_name.into(),
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, DatabaseError> {
        QueryBuilder::<T>::new(&self.table_name)?
            .filter(filter_data)?
            .select_all(&self.pool)
            .await
    }

    pub async fn select_one(&self, filter_data: FilterData) -> Result<Option<T>, DatabaseError> {
        QueryBuilder::<T>::new(&self.table_name)?
            .filter(FilterData {
                limit: Some(1),
                ..filter_data
            })?
            .select_optional(&self.pool)
            .await
    }

    pub async fn select_id(&self, id: Uuid) -> Result<Option<T>, DatabaseError> {
        self.select_one(FilterData::with_where(json!({ "id": id }))).await
    }

    pub async fn count(&self, filter_data: FilterData) -> Result<i64, DatabaseError> {
        QueryBuilder::<T>::new(&self.table_name)?
            .filter(FilterData {
                order: None,
                limit: None,
                offset: None,
                ..filter_data
            })?
            .count(&self.pool)
            .await
    }

    /// Deletes by id, returning whether a row was removed
    pub async fn delete_id(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let sql = format!("DELETE FROM \"{}\" WHERE \"id\" = $1", self.table_name);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
