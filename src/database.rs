use crate::models::{
    Author, AuthorExistsError, AuthorName, Book, CreateAuthorError, CreateAuthorRequest,
    DeleteAuthorError, DeleteAuthorRequest, FindAuthorByNameError, FindAuthorByNameRequest,
    FindAuthorError, FindAuthorRequest, ListAuthorsError, UpdateAuthorError, UpdateAuthorRequest,
};
use crate::repositories::AuthorRepository;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, Row, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;

static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Debug, Clone)]
pub struct Sqlite {
    pool: SqlitePool,
}

impl Sqlite {
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database url {url}"))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePool::connect_with(opts)
            .await
            .with_context(|| format!("Failed to open database at {url}"))?;

        Self::migrate(pool).await
    }

    /// Opens a private in-memory database.
    ///
    /// The pool holds exactly one connection that is never recycled, since
    /// every new SQLite memory connection starts from an empty database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Invalid in-memory database url")?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .context("Failed to open in-memory database")?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> anyhow::Result<Self> {
        MIGRATOR
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;

        Ok(Self { pool })
    }
}

impl<'r> FromRow<'r, SqliteRow> for Author {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let name = row.try_get("name")?;

        let name = AuthorName::new_unchecked(name);
        Ok(Self::new(id, name))
    }
}

impl<'r> FromRow<'r, SqliteRow> for Book {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let title = row.try_get("title")?;
        let author_id = row.try_get("author_id")?;

        Ok(Self::new(id, title, author_id))
    }
}

#[async_trait]
impl AuthorRepository for Sqlite {
    async fn list_authors(&self) -> Result<Vec<Author>, ListAuthorsError> {
        let authors = sqlx::query_as("SELECT id, name FROM author ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err).context("Failed to retrieve all authors");
                ListAuthorsError(err)
            })?;

        Ok(authors)
    }

    async fn list_authors_with_books(&self) -> Result<Vec<Author>, ListAuthorsError> {
        // One read transaction so authors and books come from the same snapshot.
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction for authors with books")?;

        let authors: Vec<Author> = sqlx::query_as("SELECT id, name FROM author ORDER BY id")
            .fetch_all(&mut *tx)
            .await
            .context("Failed to retrieve all authors")?;

        let books: Vec<Book> =
            sqlx::query_as("SELECT id, title, author_id FROM book ORDER BY id")
                .fetch_all(&mut *tx)
                .await
                .context("Failed to retrieve books of all authors")?;

        tx.commit()
            .await
            .context("Failed to commit transaction for authors with books")?;

        let mut books_by_author: HashMap<i32, Vec<Book>> = HashMap::new();
        for book in books {
            books_by_author.entry(book.author_id()).or_default().push(book);
        }

        let authors = authors
            .into_iter()
            .map(|author| {
                let books = books_by_author.remove(&author.id()).unwrap_or_default();
                author.with_books(books)
            })
            .collect();

        Ok(authors)
    }

    async fn find_author(&self, req: &FindAuthorRequest) -> Result<Author, FindAuthorError> {
        let author = sqlx::query_as("SELECT id, name FROM author WHERE id = ?")
            .bind(req.id())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if matches!(err, sqlx::Error::RowNotFound) {
                    FindAuthorError::NotFound { id: req.id() }
                } else {
                    let err = anyhow!(err).context(format!(
                        r#"Failed to retrieve author with id "{}""#,
                        req.id()
                    ));
                    FindAuthorError::Other(err)
                }
            })?;

        Ok(author)
    }

    async fn find_author_by_name(
        &self,
        req: &FindAuthorByNameRequest,
    ) -> Result<Author, FindAuthorByNameError> {
        // instr() is a case-sensitive substring test with no wildcard escaping to worry about.
        let author = sqlx::query_as(
            "SELECT id, name FROM author WHERE instr(name, ?) > 0 ORDER BY id LIMIT 1",
        )
        .bind(req.fragment())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if matches!(err, sqlx::Error::RowNotFound) {
                FindAuthorByNameError::NotFound {
                    fragment: req.fragment().to_string(),
                }
            } else {
                let err = anyhow!(err).context(format!(
                    r#"Failed to retrieve author with name containing "{}""#,
                    req.fragment()
                ));
                FindAuthorByNameError::Other(err)
            }
        })?;

        Ok(author)
    }

    async fn author_name_exists(&self, name: &AuthorName) -> Result<bool, AuthorExistsError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM author WHERE name = ?)")
            .bind(name.as_str())
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!(r#"Failed to check for author with name "{name}""#))?;

        Ok(exists)
    }

    async fn author_exists(&self, id: i32) -> Result<bool, AuthorExistsError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM author WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!(r#"Failed to check for author with id "{id}""#))?;

        Ok(exists)
    }

    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError> {
        let to_create_error = |err: sqlx::Error| {
            if is_unique_violation(&err) {
                CreateAuthorError::Duplicate {
                    name: req.name().to_string(),
                }
            } else {
                let err = anyhow!(err).context(format!(
                    r#"Failed to create author with name "{}""#,
                    req.name()
                ));
                CreateAuthorError::Other(err)
            }
        };

        let mut tx = self.pool.begin().await.map_err(to_create_error)?;

        let author: Author =
            sqlx::query_as("INSERT INTO author (name) VALUES (?) RETURNING id, name")
                .bind(req.name().as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(to_create_error)?;

        let mut books = Vec::with_capacity(req.books().len());
        for book in req.books() {
            let book: Book = sqlx::query_as(
                "INSERT INTO book (title, author_id) VALUES (?, ?) RETURNING id, title, author_id",
            )
            .bind(book.title())
            .bind(author.id())
            .fetch_one(&mut *tx)
            .await
            .map_err(to_create_error)?;
            books.push(book);
        }

        tx.commit().await.map_err(to_create_error)?;

        Ok(author.with_books(books))
    }

    async fn update_author(&self, req: &UpdateAuthorRequest) -> Result<(), UpdateAuthorError> {
        let result = sqlx::query("UPDATE author SET name = ? WHERE id = ?")
            .bind(req.name().as_str())
            .bind(req.id())
            .execute(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    UpdateAuthorError::Duplicate {
                        name: req.name().to_string(),
                    }
                } else {
                    let err = anyhow!(err)
                        .context(format!(r#"Failed to update author with id "{}""#, req.id()));
                    UpdateAuthorError::Other(err)
                }
            })?;

        if result.rows_affected() == 0 {
            tracing::debug!(id = req.id(), "author vanished before update, nothing changed");
        }

        Ok(())
    }

    async fn delete_author(&self, req: &DeleteAuthorRequest) -> Result<(), DeleteAuthorError> {
        let result = sqlx::query("DELETE FROM author WHERE id = ?")
            .bind(req.id())
            .execute(&self.pool)
            .await
            .with_context(|| format!(r#"Failed to delete author with id "{}""#, req.id()))?;

        if result.rows_affected() == 0 {
            tracing::debug!(id = req.id(), "author vanished before delete, nothing changed");
        }

        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.is_unique_violation();
    }

    false
}
