//! User-defined transaction categories and their CRUD endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    AppState, Error, database_id::CategoryId, transaction::TransactionKind, user::UserID,
};

/// A user-defined category that transactions can be labeled with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The display name of the category.
    pub name: String,
    /// The icon shown next to the category, e.g. an emoji.
    pub icon: String,
    /// Whether the category applies to income or expense transactions.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// The user that owns the category.
    pub user_id: UserID,
}

/// Create the category table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                icon TEXT NOT NULL,
                kind TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn get_category(id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    let category = connection
        .prepare("SELECT id, name, icon, kind, user_id FROM category WHERE id = :id")?
        .query_row(&[(":id", &id)], map_category_row)?;

    Ok(category)
}

/// Retrieve the categories owned by `user_id`, ordered by name.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_categories_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, icon, kind, user_id FROM category
             WHERE user_id = :user_id ORDER BY name",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(Error::SqlError))
        .collect()
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        icon: row.get(2)?,
        kind: row.get(3)?,
        user_id: UserID::new(row.get(4)?),
    })
}

/// The state needed for the category endpoints.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a category.
#[derive(Debug, Deserialize)]
pub struct CreateCategoryBody {
    /// The display name of the category.
    name: String,
    /// The icon shown next to the category.
    icon: String,
    /// Whether the category applies to income or expense transactions.
    #[serde(rename = "type")]
    kind: TransactionKind,
}

/// A route handler for creating a category.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Json(body): Json<CreateCategoryBody>,
) -> Result<Response, Error> {
    if body.name.trim().is_empty() {
        return Err(Error::MissingField("name"));
    }

    if body.icon.trim().is_empty() {
        return Err(Error::MissingField("icon"));
    }

    let connection = state.db_connection.lock().unwrap();

    connection.execute(
        "INSERT INTO category (name, icon, kind, user_id) VALUES (?1, ?2, ?3, ?4)",
        (
            body.name.trim(),
            body.icon.trim(),
            body.kind,
            user_id.as_i64(),
        ),
    )?;

    let category = get_category(connection.last_insert_rowid(), &connection)?;

    Ok((StatusCode::CREATED, Json(category)).into_response())
}

/// A route handler for listing the requesting user's categories.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_categories_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().unwrap();

    let categories = get_categories_for_user(user_id, &connection)?;

    Ok(Json(categories).into_response())
}

/// The request body for updating a category. Omitted fields keep their
/// current value.
#[derive(Debug, Deserialize)]
pub struct UpdateCategoryBody {
    /// The display name of the category.
    name: Option<String>,
    /// The icon shown next to the category.
    icon: Option<String>,
    /// Whether the category applies to income or expense transactions.
    #[serde(rename = "type")]
    kind: Option<TransactionKind>,
}

/// A route handler for updating a category.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn update_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Path(category_id): Path<CategoryId>,
    Json(body): Json<UpdateCategoryBody>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().unwrap();

    let mut category = get_category(category_id, &connection)?;

    if category.user_id != user_id {
        return Err(Error::Forbidden);
    }

    if let Some(name) = body.name {
        if name.trim().is_empty() {
            return Err(Error::MissingField("name"));
        }
        category.name = name.trim().to_string();
    }
    if let Some(icon) = body.icon {
        category.icon = icon;
    }
    if let Some(kind) = body.kind {
        category.kind = kind;
    }

    connection.execute(
        "UPDATE category SET name = ?1, icon = ?2, kind = ?3 WHERE id = ?4",
        (&category.name, &category.icon, category.kind, category.id),
    )?;

    Ok(Json(category).into_response())
}

/// A route handler for deleting a category.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Path(category_id): Path<CategoryId>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().unwrap();

    let category = get_category(category_id, &connection)?;

    if category.user_id != user_id {
        return Err(Error::Forbidden);
    }

    connection.execute(
        "DELETE FROM category WHERE id = :id",
        &[(":id", &category_id)],
    )?;

    Ok(Json(json!({"success": true})).into_response())
}
