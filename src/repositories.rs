use crate::models::{
    Author, AuthorExistsError, AuthorName, CreateAuthorError, CreateAuthorRequest,
    DeleteAuthorError, DeleteAuthorRequest, FindAuthorByNameError, FindAuthorByNameRequest,
    FindAuthorError, FindAuthorRequest, ListAuthorsError, UpdateAuthorError, UpdateAuthorRequest,
};
use async_trait::async_trait;

/// Persistence port for authors.
///
/// Existence checks and mutations are separate calls; callers combining
/// them get no atomicity across the pair.
#[async_trait]
pub trait AuthorRepository: Send + Sync + 'static {
    async fn list_authors(&self) -> Result<Vec<Author>, ListAuthorsError>;

    async fn list_authors_with_books(&self) -> Result<Vec<Author>, ListAuthorsError>;

    async fn find_author(&self, req: &FindAuthorRequest) -> Result<Author, FindAuthorError>;

    /// Returns the lowest-id author whose name contains the fragment.
    async fn find_author_by_name(
        &self,
        req: &FindAuthorByNameRequest,
    ) -> Result<Author, FindAuthorByNameError>;

    async fn author_name_exists(&self, name: &AuthorName) -> Result<bool, AuthorExistsError>;

    async fn author_exists(&self, id: i32) -> Result<bool, AuthorExistsError>;

    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError>;

    /// Replaces the stored author. Updating a missing id is a no-op.
    async fn update_author(&self, req: &UpdateAuthorRequest) -> Result<(), UpdateAuthorError>;

    /// Removes the author and its books. Deleting a missing id is a no-op.
    async fn delete_author(&self, req: &DeleteAuthorRequest) -> Result<(), DeleteAuthorError>;
}
