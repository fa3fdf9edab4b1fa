use crate::http::AppState;
use crate::models::{
    Author, AuthorExistsError, AuthorName, AuthorNameError, Book, CreateAuthorError,
    CreateAuthorRequest, DeleteAuthorError, DeleteAuthorRequest, FindAuthorByNameError,
    FindAuthorByNameRequest, FindAuthorError, FindAuthorRequest, ListAuthorsError, NewBook,
    UpdateAuthorError, UpdateAuthorRequest, ValidationFailure,
};
use crate::repositories::AuthorRepository;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub struct ApiSuccess<T: Serialize>(StatusCode, Json<ApiResponse<T>>);

impl<T: Serialize> ApiSuccess<T> {
    pub const fn new(status: StatusCode, data: T) -> Self {
        Self(status, Json(ApiResponse::new(status, data)))
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> axum::response::Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    status_code: u16,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    const fn new(status: StatusCode, data: T) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    InternalServerError(String),
    BadRequest(String),
    Validation(Vec<ValidationFailure>),
    NotFound(String),
}

impl ApiError {
    fn internal(cause: &anyhow::Error) -> Self {
        tracing::error!(error = ?cause, "request failed on a store error");
        Self::InternalServerError("Internal server error".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::InternalServerError(msg) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ApiResponse::new(status, msg))).into_response()
            }
            Self::BadRequest(msg) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ApiResponse::new(status, msg))).into_response()
            }
            Self::Validation(failures) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ApiResponse::new(status, failures))).into_response()
            }
            Self::NotFound(msg) => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ApiResponse::new(status, msg))).into_response()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!(%rejection, "rejected malformed request body");
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::warn!(%rejection, "rejected malformed path");
        Self::BadRequest(rejection.body_text())
    }
}

/// JSON body extractor whose rejections use the error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(T);

/// Path extractor whose rejections use the error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(T);

impl From<AuthorNameError> for ApiError {
    fn from(err: AuthorNameError) -> Self {
        tracing::warn!(%err, "rejected invalid author");
        Self::Validation(err.into_failures())
    }
}

impl From<CreateAuthorError> for ApiError {
    fn from(err: CreateAuthorError) -> Self {
        match err {
            CreateAuthorError::Duplicate { .. } => {
                tracing::warn!(%err, "rejected duplicate author");
                Self::BadRequest(err.to_string())
            }
            CreateAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<FindAuthorError> for ApiError {
    fn from(err: FindAuthorError) -> Self {
        match err {
            FindAuthorError::NotFound { .. } => Self::NotFound(err.to_string()),
            FindAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<FindAuthorByNameError> for ApiError {
    fn from(err: FindAuthorByNameError) -> Self {
        match err {
            FindAuthorByNameError::NotFound { .. } => Self::NotFound(err.to_string()),
            FindAuthorByNameError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<UpdateAuthorError> for ApiError {
    fn from(err: UpdateAuthorError) -> Self {
        match err {
            UpdateAuthorError::Duplicate { .. } => {
                tracing::warn!(%err, "rejected rename to a duplicate author name");
                Self::BadRequest(err.to_string())
            }
            UpdateAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<ListAuthorsError> for ApiError {
    fn from(err: ListAuthorsError) -> Self {
        Self::internal(&err.0)
    }
}

impl From<AuthorExistsError> for ApiError {
    fn from(err: AuthorExistsError) -> Self {
        Self::internal(&err.0)
    }
}

impl From<DeleteAuthorError> for ApiError {
    fn from(err: DeleteAuthorError) -> Self {
        Self::internal(&err.0)
    }
}

/// Body accepted by both create and update.
///
/// `id` defaults to 0 when omitted; create ignores it and update compares
/// it with the id in the path. `books` are only persisted on create.
#[derive(Debug, Deserialize)]
pub struct AuthorHttpRequest {
    #[serde(default)]
    id: i32,
    name: Option<String>,
    books: Option<Vec<BookHttpRequest>>,
}

#[derive(Debug, Deserialize)]
pub struct BookHttpRequest {
    title: String,
}

impl TryFrom<AuthorHttpRequest> for CreateAuthorRequest {
    type Error = AuthorNameError;

    fn try_from(value: AuthorHttpRequest) -> Result<Self, Self::Error> {
        let name = AuthorName::new(value.name.as_deref())?;
        let books = value
            .books
            .unwrap_or_default()
            .into_iter()
            .map(|book| NewBook::new(book.title))
            .collect();
        Ok(Self::new(name, books))
    }
}

impl TryFrom<AuthorHttpRequest> for UpdateAuthorRequest {
    type Error = AuthorNameError;

    fn try_from(value: AuthorHttpRequest) -> Result<Self, Self::Error> {
        let name = AuthorName::new(value.name.as_deref())?;
        Ok(Self::new(value.id, name))
    }
}

#[derive(Debug, Serialize)]
pub struct AuthorHttpResponse {
    id: i32,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    books: Option<Vec<BookHttpResponse>>,
}

impl From<Author> for AuthorHttpResponse {
    fn from(value: Author) -> Self {
        let (id, name, books) = value.into_parts();
        Self {
            id,
            name: name.to_string(),
            books: books.map(|books| books.into_iter().map(Into::into).collect()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookHttpResponse {
    id: i32,
    title: String,
    author_id: i32,
}

impl From<Book> for BookHttpResponse {
    fn from(value: Book) -> Self {
        Self {
            id: value.id(),
            title: value.title().to_string(),
            author_id: value.author_id(),
        }
    }
}

fn author_not_found(id: i32) -> ApiError {
    ApiError::from(FindAuthorError::NotFound { id })
}

pub async fn health_check() -> ApiSuccess<&'static str> {
    ApiSuccess::new(StatusCode::OK, "ok")
}

pub async fn list_authors<AR: AuthorRepository>(
    State(state): State<AppState<AR>>,
) -> Result<ApiSuccess<Vec<AuthorHttpResponse>>, ApiError> {
    tracing::info!("listing authors");
    state
        .author_repo
        .list_authors()
        .await
        .map_err(ApiError::from)
        .map(|authors| ApiSuccess::new(StatusCode::OK, authors.into_iter().map(Into::into).collect()))
}

pub async fn list_authors_with_books<AR: AuthorRepository>(
    State(state): State<AppState<AR>>,
) -> Result<ApiSuccess<Vec<AuthorHttpResponse>>, ApiError> {
    tracing::info!("listing authors with books");
    state
        .author_repo
        .list_authors_with_books()
        .await
        .map_err(ApiError::from)
        .map(|authors| ApiSuccess::new(StatusCode::OK, authors.into_iter().map(Into::into).collect()))
}

/// Looks an author up by id when `key` is an integer, otherwise by name fragment.
pub async fn find_author<AR: AuthorRepository>(
    State(state): State<AppState<AR>>,
    ApiPath(key): ApiPath<String>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError> {
    let author = match key.parse::<i32>() {
        Ok(id) => {
            state
                .author_repo
                .find_author(&FindAuthorRequest::new(id))
                .await?
        }
        Err(_) => {
            state
                .author_repo
                .find_author_by_name(&FindAuthorByNameRequest::new(&key))
                .await?
        }
    };

    Ok(ApiSuccess::new(StatusCode::OK, author.into()))
}

pub async fn create_author<AR: AuthorRepository>(
    State(state): State<AppState<AR>>,
    ApiJson(body): ApiJson<AuthorHttpRequest>,
) -> Result<StatusCode, ApiError> {
    let req: CreateAuthorRequest = body.try_into()?;

    if state.author_repo.author_name_exists(req.name()).await? {
        return Err(CreateAuthorError::Duplicate {
            name: req.name().to_string(),
        }
        .into());
    }

    let author = state.author_repo.create_author(&req).await?;
    tracing::info!(id = author.id(), name = %author.name(), "created author");

    Ok(StatusCode::OK)
}

pub async fn update_author<AR: AuthorRepository>(
    State(state): State<AppState<AR>>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<AuthorHttpRequest>,
) -> Result<StatusCode, ApiError> {
    let req: UpdateAuthorRequest = body.try_into()?;

    if req.id() != id {
        tracing::warn!(body_id = req.id(), path_id = id, "rejected update with mismatched ids");
        return Err(ApiError::BadRequest(format!(
            "Author id \"{}\" does not match id \"{id}\" in the URL",
            req.id()
        )));
    }

    if !state.author_repo.author_exists(id).await? {
        return Err(author_not_found(id));
    }

    state.author_repo.update_author(&req).await?;
    tracing::info!(id, name = %req.name(), "updated author");

    Ok(StatusCode::OK)
}

pub async fn delete_author<AR: AuthorRepository>(
    State(state): State<AppState<AR>>,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    if !state.author_repo.author_exists(id).await? {
        return Err(author_not_found(id));
    }

    state
        .author_repo
        .delete_author(&DeleteAuthorRequest::new(id))
        .await?;
    tracing::info!(id, "deleted author");

    Ok(StatusCode::OK)
}
