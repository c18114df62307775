use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::schema::SCHEMA;
use super::url::{DatabaseLocation, parse_database_url};
use super::{Store, StoreStats};
use crate::error::{Error, Result};
use crate::types::*;

const USER_COLUMNS: &str = "id, email, password_hash, name, role, created_at";
const POST_COLUMNS: &str = "p.id, p.title, p.subtitle, p.date, p.body, p.img_url, p.author_id";
const COMMENT_COLUMNS: &str = "c.id, c.text, c.author_id, c.post_id, c.created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Opens the database named by a connection string such as `sqlite://quill.db`.
    pub fn open(database_url: &str) -> Result<Self> {
        match parse_database_url(database_url)? {
            DatabaseLocation::Memory => Self::in_memory(),
            DatabaseLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Self::new(path)
            }
        }
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

// Fixed width so that stored timestamps compare correctly as text.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_role(s: &str) -> Role {
    Role::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid role in database: '{}'", s);
        Role::Reader
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        role: parse_role(&row.get::<_, String>(4)?),
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn row_to_post(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        subtitle: row.get(2)?,
        date: row.get(3)?,
        body: row.get(4)?,
        img_url: row.get(5)?,
        author_id: row.get(6)?,
    })
}

fn row_to_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        text: row.get(1)?,
        author_id: row.get(2)?,
        post_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn user_exists(conn: &Connection, id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM users WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn post_exists(conn: &Connection, id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM posts WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &NewUser) -> Result<User> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let existing: i64 = tx.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        let role = Role::for_new_account(existing);
        let created_at = Utc::now();

        let result = tx.execute(
            "INSERT INTO users (email, password_hash, name, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.email,
                user.password_hash,
                user.name,
                role.as_str(),
                format_datetime(&created_at),
            ],
        );

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(Error::DuplicateEmail),
            Err(e) => return Err(Error::from(e)),
        }

        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(User {
            id,
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            name: user.name.clone(),
            role,
            created_at,
        })
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_admin(&self) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE role = 'admin' ORDER BY id LIMIT 1"),
            [],
            row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
        let rows = stmt.query_map([], row_to_user)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_user(&self, id: i64) -> Result<bool> {
        // Posts, comments and sessions go with the user via ON DELETE CASCADE.
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Post operations

    fn create_post(&self, post: &NewPost) -> Result<Post> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !user_exists(&tx, post.author_id)? {
            return Err(Error::NotFound);
        }

        let result = tx.execute(
            "INSERT INTO posts (title, subtitle, date, body, img_url, author_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                post.title,
                post.subtitle,
                post.date,
                post.body,
                post.img_url,
                post.author_id,
            ],
        );

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::DuplicateTitle(post.title.clone()));
            }
            Err(e) => return Err(Error::from(e)),
        }

        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Post {
            id,
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            date: post.date.clone(),
            body: post.body.clone(),
            img_url: post.img_url.clone(),
            author_id: post.author_id,
        })
    }

    fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1"),
            params![id],
            row_to_post,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_post_with_author(&self, id: i64) -> Result<Option<PostWithAuthor>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {POST_COLUMNS}, u.name FROM posts p
                 JOIN users u ON u.id = p.author_id
                 WHERE p.id = ?1"
            ),
            params![id],
            |row| {
                Ok(PostWithAuthor {
                    post: row_to_post(row)?,
                    author_name: row.get(7)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_posts(&self) -> Result<Vec<PostWithAuthor>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS}, u.name FROM posts p
             JOIN users u ON u.id = p.author_id
             ORDER BY p.id"
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok(PostWithAuthor {
                post: row_to_post(row)?,
                author_name: row.get(7)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_post(&self, post: &Post) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !user_exists(&tx, post.author_id)? {
            return Err(Error::NotFound);
        }

        // date is fixed at creation and never part of an update.
        let result = tx.execute(
            "UPDATE posts SET title = ?1, subtitle = ?2, body = ?3, img_url = ?4, author_id = ?5
             WHERE id = ?6",
            params![
                post.title,
                post.subtitle,
                post.body,
                post.img_url,
                post.author_id,
                post.id
            ],
        );

        let rows = match result {
            Ok(rows) => rows,
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::DuplicateTitle(post.title.clone()));
            }
            Err(e) => return Err(Error::from(e)),
        };

        if rows == 0 {
            return Err(Error::NotFound);
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_post(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM comments WHERE post_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM posts WHERE id = ?1", params![id])?;

        tx.commit()?;
        Ok(rows > 0)
    }

    // Comment operations

    fn create_comment(&self, comment: &NewComment) -> Result<Comment> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !post_exists(&tx, comment.post_id)? || !user_exists(&tx, comment.author_id)? {
            return Err(Error::NotFound);
        }

        let created_at = Utc::now();
        tx.execute(
            "INSERT INTO comments (text, author_id, post_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                comment.text,
                comment.author_id,
                comment.post_id,
                format_datetime(&created_at),
            ],
        )?;

        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Comment {
            id,
            text: comment.text.clone(),
            author_id: comment.author_id,
            post_id: comment.post_id,
            created_at,
        })
    }

    fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = ?1"),
            params![id],
            row_to_comment,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_comments(&self) -> Result<Vec<Comment>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {COMMENT_COLUMNS} FROM comments c ORDER BY c.id"))?;
        let rows = stmt.query_map([], row_to_comment)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_comments_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS}, u.name FROM comments c
             JOIN users u ON u.id = c.author_id
             WHERE c.post_id = ?1
             ORDER BY c.id"
        ))?;

        let rows = stmt.query_map(params![post_id], |row| {
            Ok(CommentWithAuthor {
                comment: row_to_comment(row)?,
                author_name: row.get(5)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_comment(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM comments WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Session operations

    fn create_session(&self, session: &Session) -> Result<()> {
        self.conn().execute(
            "INSERT INTO sessions (id, user_id, csrf_token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id,
                session.user_id,
                session.csrf_token,
                format_datetime(&session.created_at),
                format_datetime(&session.expires_at),
            ],
        )?;
        Ok(())
    }

    fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, csrf_token, created_at, expires_at FROM sessions WHERE id = ?1",
            params![id],
            |row| {
                Ok(Session {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    csrf_token: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                    expires_at: parse_datetime(&row.get::<_, String>(4)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![format_datetime(&now)],
        )?;
        Ok(rows)
    }

    fn count_sessions(&self) -> Result<i64> {
        self.conn()
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .map_err(Error::from)
    }

    fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn();
        conn.query_row(
            "SELECT (SELECT COUNT(*) FROM users),
                    (SELECT COUNT(*) FROM posts),
                    (SELECT COUNT(*) FROM comments)",
            [],
            |row| {
                Ok(StoreStats {
                    users: row.get(0)?,
                    posts: row.get(1)?,
                    comments: row.get(2)?,
                })
            },
        )
        .map_err(Error::from)
    }
}
