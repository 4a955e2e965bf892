use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{
        CategoryArticleCount, CreateUserParams, RepoError, UpdateProfileParams, UserSummary,
        UsersRepo, UsersWriteRepo,
    },
    domain::entities::{CategoryRef, UserRecord},
};

use super::{PostgresRepositories, map_sqlx_error};

const USER_COLUMNS: &str =
    "id, name, username, email, password_hash, is_admin, image, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    username: String,
    email: String,
    password_hash: String,
    is_admin: bool,
    image: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            is_admin: row.is_admin,
            image: row.image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserSummaryRow {
    name: String,
    username: String,
    email: String,
    image: Option<String>,
    is_admin: bool,
    articles_count: i64,
    updated_at: OffsetDateTime,
}

#[derive(sqlx::FromRow)]
struct CategoryCountRow {
    id: i64,
    name: String,
    slug: String,
    articles_count: i64,
}

impl PostgresRepositories {
    async fn find_user_where(&self, column: &str, value: &str) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn user_value_taken(
        &self,
        column: &str,
        value: &str,
        except: Option<i64>,
    ) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(&format!(
            "SELECT EXISTS (SELECT 1 FROM users \
             WHERE {column} = $1 AND ($2::BIGINT IS NULL OR id <> $2))"
        ))
        .bind(value)
        .bind(except)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        self.find_user_where("email", email).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        self.find_user_where("username", username).await
    }

    async fn email_taken(&self, email: &str, except: Option<i64>) -> Result<bool, RepoError> {
        self.user_value_taken("email", email, except).await
    }

    async fn username_taken(&self, username: &str, except: Option<i64>) -> Result<bool, RepoError> {
        self.user_value_taken("username", username, except).await
    }

    async fn list_users(&self, exclude: i64) -> Result<Vec<UserSummary>, RepoError> {
        let rows = sqlx::query_as::<_, UserSummaryRow>(
            r#"
            SELECT u.name, u.username, u.email, u.image, u.is_admin, u.updated_at,
                   (SELECT COUNT(*) FROM articles a WHERE a.user_id = u.id) AS articles_count
            FROM users u
            WHERE u.id <> $1
            ORDER BY u.updated_at DESC, u.id DESC
            "#,
        )
        .bind(exclude)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(UserSummary {
                    name: row.name,
                    username: row.username,
                    email: row.email,
                    image: row.image,
                    is_admin: row.is_admin,
                    articles_count: Self::convert_count(row.articles_count)?,
                    updated_at: row.updated_at,
                })
            })
            .collect()
    }

    async fn user_article_count(&self, user_id: i64) -> Result<u64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn user_category_counts(
        &self,
        user_id: i64,
    ) -> Result<Vec<CategoryArticleCount>, RepoError> {
        let rows = sqlx::query_as::<_, CategoryCountRow>(
            r#"
            SELECT c.id, c.name, c.slug, COUNT(a.id) AS articles_count
            FROM categories c
            LEFT JOIN articles a ON a.category_id = c.id AND a.user_id = $1
            GROUP BY c.id, c.name, c.slug
            ORDER BY LOWER(c.name), c.id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(CategoryArticleCount {
                    category: CategoryRef {
                        id: row.id,
                        name: row.name,
                        slug: row.slug,
                    },
                    articles_count: Self::convert_count(row.articles_count)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl UsersWriteRepo for PostgresRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut tx = self.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (name, username, email, password_hash, is_admin) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(&params.name)
        .bind(&params.username)
        .bind(&params.email)
        .bind(&params.password_hash)
        .bind(params.is_admin)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError> {
        let mut tx = self.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET name = $2, username = $3, email = $4, updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(params.id)
        .bind(&params.name)
        .bind(&params.username)
        .bind(&params.email)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), RepoError> {
        let mut tx = self.begin().await?;

        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_image(&self, id: i64, image: Option<&str>) -> Result<Option<String>, RepoError> {
        let mut tx = self.begin().await?;

        let previous = sqlx::query_scalar::<_, Option<String>>(
            "SELECT image FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        sqlx::query("UPDATE users SET image = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(image)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(previous)
    }

    async fn delete_user(&self, id: i64) -> Result<(), RepoError> {
        let mut tx = self.begin().await?;

        let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if locked.is_none() {
            return Err(RepoError::NotFound);
        }

        let has_articles =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM articles WHERE user_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        if has_articles {
            return Err(RepoError::Integrity {
                message: format!("user {id} still owns articles"),
            });
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}
