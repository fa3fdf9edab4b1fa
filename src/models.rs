use serde::Serialize;
use thiserror::Error;

const NAME_FIELD: &str = "name";
const NAME_MAX_CHARS: usize = 5;

/// A single rule violation reported against a submitted author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    field: &'static str,
    message: &'static str,
}

impl ValidationFailure {
    pub const fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }

    pub const fn field(&self) -> &'static str {
        self.field
    }

    pub const fn message(&self) -> &'static str {
        self.message
    }
}

type NameRule = fn(Option<&str>) -> Option<ValidationFailure>;

const NAME_RULES: [NameRule; 3] = [name_required, name_max_length, name_first_letter_uppercase];

/// Runs every author name rule against `name`.
///
/// Rules are evaluated lazily as the iterator is consumed, and a failing
/// rule never stops the ones after it.
pub fn validate_author_name(name: Option<&str>) -> impl Iterator<Item = ValidationFailure> + '_ {
    NAME_RULES.into_iter().filter_map(move |rule| rule(name))
}

fn name_required(name: Option<&str>) -> Option<ValidationFailure> {
    match name {
        Some(name) if !name.trim().is_empty() => None,
        _ => Some(ValidationFailure::new(
            NAME_FIELD,
            "The name field is required.",
        )),
    }
}

fn name_max_length(name: Option<&str>) -> Option<ValidationFailure> {
    let name = name?;
    (name.chars().count() > NAME_MAX_CHARS).then(|| {
        ValidationFailure::new(
            NAME_FIELD,
            "The name field must not be longer than 5 characters.",
        )
    })
}

fn name_first_letter_uppercase(name: Option<&str>) -> Option<ValidationFailure> {
    let first = name?.chars().next()?;
    // Caseless characters and ones that only uppercase to several (ß -> SS) pass.
    let mut upper = first.to_uppercase();
    let lowered = match (upper.next(), upper.next()) {
        (Some(single), None) => single != first,
        _ => false,
    };
    lowered.then(|| ValidationFailure::new(NAME_FIELD, "The first letter must be uppercase."))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName(String);

impl AuthorName {
    pub fn new(raw: Option<&str>) -> Result<Self, AuthorNameError> {
        let failures: Vec<_> = validate_author_name(raw).collect();
        match raw {
            Some(raw) if failures.is_empty() => Ok(Self(raw.into())),
            _ => Err(AuthorNameError(failures)),
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AuthorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
#[error("{}", join_messages(.0))]
pub struct AuthorNameError(Vec<ValidationFailure>);

impl AuthorNameError {
    pub fn failures(&self) -> &[ValidationFailure] {
        &self.0
    }

    pub fn into_failures(self) -> Vec<ValidationFailure> {
        self.0
    }
}

fn join_messages(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(ValidationFailure::message)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    id: i32,
    title: String,
    author_id: i32,
}

impl Book {
    pub const fn new(id: i32, title: String, author_id: i32) -> Self {
        Self {
            id,
            title,
            author_id,
        }
    }

    pub const fn id(&self) -> i32 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub const fn author_id(&self) -> i32 {
        self.author_id
    }
}

/// An author as stored.
///
/// `books` is `None` when the author was loaded without its books and
/// `Some` (possibly empty) when they were loaded eagerly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    id: i32,
    name: AuthorName,
    books: Option<Vec<Book>>,
}

impl Author {
    pub const fn new(id: i32, name: AuthorName) -> Self {
        Self {
            id,
            name,
            books: None,
        }
    }

    #[must_use]
    pub fn with_books(mut self, books: Vec<Book>) -> Self {
        self.books = Some(books);
        self
    }

    pub const fn id(&self) -> i32 {
        self.id
    }

    pub const fn name(&self) -> &AuthorName {
        &self.name
    }

    pub fn books(&self) -> Option<&[Book]> {
        self.books.as_deref()
    }

    pub fn into_parts(self) -> (i32, AuthorName, Option<Vec<Book>>) {
        (self.id, self.name, self.books)
    }
}

#[derive(Debug, Clone)]
pub struct NewBook {
    title: String,
}

impl NewBook {
    pub const fn new(title: String) -> Self {
        Self { title }
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Debug)]
pub struct CreateAuthorRequest {
    name: AuthorName,
    books: Vec<NewBook>,
}

impl CreateAuthorRequest {
    pub const fn new(name: AuthorName, books: Vec<NewBook>) -> Self {
        Self { name, books }
    }

    pub const fn name(&self) -> &AuthorName {
        &self.name
    }

    pub fn books(&self) -> &[NewBook] {
        &self.books
    }
}

#[derive(Error, Debug)]
pub enum CreateAuthorError {
    #[error("Author with name \"{name}\" already exists")]
    Duplicate { name: String },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug)]
pub struct FindAuthorRequest {
    id: i32,
}

impl FindAuthorRequest {
    pub const fn new(id: i32) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i32 {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum FindAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: i32 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug)]
pub struct FindAuthorByNameRequest {
    fragment: String,
}

impl FindAuthorByNameRequest {
    pub fn new(fragment: &str) -> Self {
        Self {
            fragment: fragment.into(),
        }
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }
}

#[derive(Error, Debug)]
pub enum FindAuthorByNameError {
    #[error("No author name contains \"{fragment}\"")]
    NotFound { fragment: String },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct ListAuthorsError(#[from] pub anyhow::Error);

#[derive(Error, Debug)]
#[error(transparent)]
pub struct AuthorExistsError(#[from] pub anyhow::Error);

/// Full replacement of a stored author; there is no partial update.
#[derive(Debug)]
pub struct UpdateAuthorRequest {
    id: i32,
    name: AuthorName,
}

impl UpdateAuthorRequest {
    pub const fn new(id: i32, name: AuthorName) -> Self {
        Self { id, name }
    }

    pub const fn id(&self) -> i32 {
        self.id
    }

    pub const fn name(&self) -> &AuthorName {
        &self.name
    }
}

#[derive(Error, Debug)]
pub enum UpdateAuthorError {
    #[error("Author with name \"{name}\" already exists")]
    Duplicate { name: String },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug)]
pub struct DeleteAuthorRequest {
    id: i32,
}

impl DeleteAuthorRequest {
    pub const fn new(id: i32) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i32 {
        self.id
    }
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct DeleteAuthorError(#[from] pub anyhow::Error);
