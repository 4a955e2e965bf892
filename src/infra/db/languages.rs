use async_trait::async_trait;

use crate::{
    application::repos::{LanguagesRepo, RepoError},
    domain::entities::LanguageRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct LanguageRow {
    id: i64,
    code: String,
    name: String,
}

impl From<LanguageRow> for LanguageRecord {
    fn from(row: LanguageRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            name: row.name,
        }
    }
}

#[async_trait]
impl LanguagesRepo for PostgresRepositories {
    async fn list_languages(&self) -> Result<Vec<LanguageRecord>, RepoError> {
        let rows = sqlx::query_as::<_, LanguageRow>("SELECT id, code, name FROM languages ORDER BY id")
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(LanguageRecord::from).collect())
    }

    async fn find_language(&self, id: i64) -> Result<Option<LanguageRecord>, RepoError> {
        let row = sqlx::query_as::<_, LanguageRow>("SELECT id, code, name FROM languages WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(LanguageRecord::from))
    }
}
