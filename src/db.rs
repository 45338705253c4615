use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::{params, Connection, Row};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::book::BookStats;
use crate::models::review::{ReviewAuthor, ReviewDetail, ReviewSummary};
use crate::models::user::{User, UserProfile};


/// Shared handle to the SQLite store. All review mutations run inside a
/// single transaction so the book totals can never drift from the rows
/// they summarize.
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Fields of a new review, already validated by the API layer.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub rating: i64,
    pub review: String,
}

/// Mutable fields of an existing review.
#[derive(Debug, Clone)]
pub struct ReviewChanges {
    pub title: String,
    pub author: String,
    pub rating: i64,
    pub review: String,
}

impl Database {
    pub fn new(db_path: &str) -> Result<Self, AppError> {
        let conn = Connection::open(db_path)?;
        info!("Database connection established at: {}", db_path);
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn create_schema(&self) -> Result<(), AppError> {
        let conn = self.conn.lock().await;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS books (
                isbn TEXT PRIMARY KEY,
                total_rating INTEGER NOT NULL DEFAULT 0,
                total_reviews INTEGER NOT NULL DEFAULT 0
            );",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY,
                isbn TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                rating INTEGER NOT NULL,
                review TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (isbn) REFERENCES books(isbn),
                FOREIGN KEY (user_id) REFERENCES users(id)
            );
            CREATE INDEX IF NOT EXISTS idx_reviews_created_at
                ON reviews(created_at DESC);",
        )?;

        info!("Database schema created");
        Ok(())
    }

    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<i64, AppError> {
        let conn = self.conn.lock().await;
        let now = Utc::now().to_rfc3339();
        let result = conn.execute(
            "INSERT INTO users (email, password_hash, first_name, last_name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![email, password_hash, first_name, last_name, now],
        );
        match result {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                info!("User registered: id {}", id);
                Ok(id)
            }
            Err(e) if e.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) => {
                Err(AppError::Conflict("User already exists".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let conn = self.conn.lock().await;
        let result = conn.query_row(
            "SELECT id, email, password_hash, first_name, last_name, created_at, updated_at
             FROM users WHERE email = ?1",
            [email],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    password_hash: row.get(2)?,
                    first_name: row.get(3)?,
                    last_name: row.get(4)?,
                    created_at: parse_timestamp(5, row.get(5)?)?,
                    updated_at: parse_timestamp(6, row.get(6)?)?,
                })
            },
        );
        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The user shape served by login, register and /me: profile fields
    /// plus the user's own review summaries, newest first.
    pub async fn user_profile(&self, user_id: i64) -> Result<UserProfile, AppError> {
        let conn = self.conn.lock().await;
        let result = conn.query_row(
            "SELECT email, first_name, last_name, created_at, updated_at
             FROM users WHERE id = ?1",
            [user_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    parse_timestamp(3, row.get(3)?)?,
                    parse_timestamp(4, row.get(4)?)?,
                ))
            },
        );
        let (email, first_name, last_name, created_at, updated_at) = match result {
            Ok(fields) => fields,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Err(AppError::NotFound("User not found.")),
            Err(e) => return Err(e.into()),
        };

        let mut stmt = conn.prepare(
            "SELECT isbn, title, author, rating, review, created_at, updated_at
             FROM reviews WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([user_id], |row| {
            Ok(ReviewSummary {
                isbn: row.get(0)?,
                title: row.get(1)?,
                author: row.get(2)?,
                rating: row.get(3)?,
                review: row.get(4)?,
                created_at: parse_timestamp(5, row.get(5)?)?,
                updated_at: parse_timestamp(6, row.get(6)?)?,
            })
        })?;
        let reviews = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(UserProfile {
            email,
            first_name,
            last_name,
            created_at,
            updated_at,
            reviews,
        })
    }

    /// Inserts a review and bumps the book's running totals in one
    /// transaction, creating the book row on first sight of the ISBN.
    pub async fn create_review(&self, user_id: i64, new: &NewReview) -> Result<i64, AppError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO books (isbn, total_rating, total_reviews) VALUES (?1, 0, 0)",
            [&new.isbn],
        )?;

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO reviews (isbn, user_id, title, author, rating, review, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                new.isbn,
                user_id,
                new.title,
                new.author,
                new.rating,
                new.review,
                now
            ],
        )?;
        let review_id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE books
             SET total_rating = total_rating + ?1,
                 total_reviews = total_reviews + 1
             WHERE isbn = ?2",
            params![new.rating, new.isbn],
        )?;

        tx.commit()?;
        debug!("Review {} created for isbn {}", review_id, new.isbn);
        Ok(review_id)
    }

    /// Updates the review in place and moves the book's total rating by
    /// the rating delta; the review count is untouched. Only the author
    /// may update.
    pub async fn update_review(
        &self,
        review_id: i64,
        user_id: i64,
        changes: &ReviewChanges,
    ) -> Result<(), AppError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let (owner_id, isbn, old_rating) = match load_review_for_write(&tx, review_id) {
            Ok(found) => found,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Err(AppError::NotFound("Review not found.")),
            Err(e) => return Err(e.into()),
        };
        if owner_id != user_id {
            return Err(AppError::Forbidden);
        }

        tx.execute(
            "UPDATE reviews
             SET title = ?1, author = ?2, rating = ?3, review = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                changes.title,
                changes.author,
                changes.rating,
                changes.review,
                Utc::now().to_rfc3339(),
                review_id
            ],
        )?;

        tx.execute(
            "UPDATE books SET total_rating = total_rating + ?1 WHERE isbn = ?2",
            params![changes.rating - old_rating, isbn],
        )?;

        tx.commit()?;
        debug!("Review {} updated", review_id);
        Ok(())
    }

    /// Deletes the review and decrements the book's totals. The book row
    /// itself stays behind as a zero-total tombstone. Only the author may
    /// delete.
    pub async fn delete_review(&self, review_id: i64, user_id: i64) -> Result<(), AppError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let (owner_id, isbn, rating) = match load_review_for_write(&tx, review_id) {
            Ok(found) => found,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Err(AppError::NotFound("Review not found.")),
            Err(e) => return Err(e.into()),
        };
        if owner_id != user_id {
            return Err(AppError::Forbidden);
        }

        tx.execute("DELETE FROM reviews WHERE id = ?1", [review_id])?;
        tx.execute(
            "UPDATE books
             SET total_reviews = total_reviews - 1,
                 total_rating = total_rating - ?1
             WHERE isbn = ?2",
            params![rating, isbn],
        )?;

        tx.commit()?;
        debug!("Review {} deleted", review_id);
        Ok(())
    }

    /// All reviews, newest first, annotated with author name, book totals
    /// and whether the viewing user wrote them.
    pub async fn list_reviews(&self, viewer: Option<i64>) -> Result<Vec<ReviewDetail>, AppError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!("{REVIEW_DETAIL_SELECT} ORDER BY r.created_at DESC, r.id DESC"))?;
        let rows = stmt.query_map([], |row| review_detail_from_row(row, viewer))?;
        let reviews = rows.collect::<Result<Vec<_>, _>>()?;
        debug!("Fetched {} reviews", reviews.len());
        Ok(reviews)
    }

    pub async fn get_review(
        &self,
        review_id: i64,
        viewer: Option<i64>,
    ) -> Result<ReviewDetail, AppError> {
        let conn = self.conn.lock().await;
        let result = conn.query_row(
            &format!("{REVIEW_DETAIL_SELECT} WHERE r.id = ?1"),
            [review_id],
            |row| review_detail_from_row(row, viewer),
        );
        match result {
            Ok(review) => Ok(review),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(AppError::NotFound("Review not found.")),
            Err(e) => Err(e.into()),
        }
    }

    /// Raw book totals, `None` when the ISBN has never been reviewed.
    pub async fn book_totals(&self, isbn: &str) -> Result<Option<(i64, i64)>, AppError> {
        let conn = self.conn.lock().await;
        let result = conn.query_row(
            "SELECT total_rating, total_reviews FROM books WHERE isbn = ?1",
            [isbn],
            |row| Ok((row.get(0)?, row.get(1)?)),
        );
        match result {
            Ok(totals) => Ok(Some(totals)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

const REVIEW_DETAIL_SELECT: &str = "SELECT r.id, r.isbn, r.user_id, r.title, r.author, r.rating,
        r.review, r.created_at, r.updated_at,
        u.first_name, u.last_name,
        b.total_rating, b.total_reviews
     FROM reviews r
     JOIN users u ON u.id = r.user_id
     JOIN books b ON b.isbn = r.isbn";

fn load_review_for_write(
    tx: &rusqlite::Transaction<'_>,
    review_id: i64,
) -> Result<(i64, String, i64), rusqlite::Error> {
    tx.query_row(
        "SELECT user_id, isbn, rating FROM reviews WHERE id = ?1",
        [review_id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
}

fn review_detail_from_row(row: &Row<'_>, viewer: Option<i64>) -> Result<ReviewDetail, rusqlite::Error> {
    let user_id: i64 = row.get(2)?;
    Ok(ReviewDetail {
        id: row.get(0)?,
        isbn: row.get(1)?,
        user_id,
        title: row.get(3)?,
        author: row.get(4)?,
        rating: row.get(5)?,
        review: row.get(6)?,
        created_at: parse_timestamp(7, row.get(7)?)?,
        updated_at: parse_timestamp(8, row.get(8)?)?,
        user: ReviewAuthor {
            first_name: row.get(9)?,
            last_name: row.get(10)?,
        },
        book: BookStats::new(row.get(11)?, row.get(12)?),
        is_review_given: viewer == Some(user_id),
    })
}

fn parse_timestamp(idx: usize, raw: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
