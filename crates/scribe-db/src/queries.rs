use crate::Database;
use crate::models::{CommentRecord, CommentRow, PostRecord, PostRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

/// Which posts a listing query returns. The policy layer decides the
/// variant; the store only executes it.
pub enum PostFilter<'a> {
    /// Every post regardless of privacy.
    All,
    /// Public posts plus the given user's own posts.
    VisibleTo(&'a str),
    /// Public posts only.
    PublicOnly,
}

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        first_name: &str,
        last_name: &str,
        full_name: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, first_name, last_name, full_name, username, email, password, role)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![id, first_name, last_name, full_name, username, email, password_hash, role],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY full_name ASC"
            ))?;
            let rows = stmt
                .query_map([], |row| user_from_row(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Profile update. The role column is deliberately left untouched;
    /// no API path changes it.
    pub fn update_user(
        &self,
        id: &str,
        first_name: &str,
        last_name: &str,
        full_name: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users
                 SET first_name = ?2, last_name = ?3, full_name = ?4,
                     username = ?5, email = ?6, password = ?7
                 WHERE id = ?1",
                rusqlite::params![id, first_name, last_name, full_name, username, email, password_hash],
            )?;
            Ok(())
        })
    }

    pub fn delete_user(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Posts --

    pub fn insert_post(
        &self,
        id: &str,
        title: &str,
        text: &str,
        privacy: &str,
        user_id: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, title, text, privacy, user_id) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, title, text, privacy, user_id],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS}, {OWNER_COLUMNS}
                 FROM posts p JOIN users u ON p.user_id = u.id
                 WHERE p.id = ?1"
            ))?;
            let rec = stmt.query_row([id], post_record_from_row).optional()?;
            Ok(rec)
        })
    }

    /// Listing is filtered, never denied: the filter variant encodes what
    /// the requesting identity is allowed to see.
    pub fn list_posts(&self, filter: PostFilter<'_>) -> Result<Vec<PostRecord>> {
        self.with_conn(|conn| {
            let base = format!(
                "SELECT {POST_COLUMNS}, {OWNER_COLUMNS}
                 FROM posts p JOIN users u ON p.user_id = u.id"
            );
            let order = " ORDER BY p.created_at ASC";

            match filter {
                PostFilter::All => {
                    let mut stmt = conn.prepare(&format!("{base}{order}"))?;
                    collect_posts(&mut stmt, &[])
                }
                PostFilter::VisibleTo(user_id) => {
                    let mut stmt = conn.prepare(&format!(
                        "{base} WHERE p.privacy = 'Public' OR p.user_id = ?1{order}"
                    ))?;
                    collect_posts(&mut stmt, &[&user_id])
                }
                PostFilter::PublicOnly => {
                    let mut stmt =
                        conn.prepare(&format!("{base} WHERE p.privacy = 'Public'{order}"))?;
                    collect_posts(&mut stmt, &[])
                }
            }
        })
    }

    pub fn update_post(&self, id: &str, title: &str, text: &str, privacy: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE posts
                 SET title = ?2, text = ?3, privacy = ?4, updated_at = datetime('now')
                 WHERE id = ?1",
                rusqlite::params![id, title, text, privacy],
            )?;
            Ok(())
        })
    }

    pub fn delete_post(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, id: &str, text: &str, post_id: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, text, post_id, user_id) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, text, post_id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COMMENT_COLUMNS}, {OWNER_COLUMNS}
                 FROM comments c JOIN users u ON c.user_id = u.id
                 WHERE c.id = ?1"
            ))?;
            let rec = stmt.query_row([id], comment_record_from_row).optional()?;
            Ok(rec)
        })
    }

    /// No privacy filter here: comments under a post are visible to any
    /// caller, even when the parent post is Private.
    pub fn list_comments(&self, post_id: &str) -> Result<Vec<CommentRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COMMENT_COLUMNS}, {OWNER_COLUMNS}
                 FROM comments c JOIN users u ON c.user_id = u.id
                 WHERE c.post_id = ?1
                 ORDER BY c.created_at ASC"
            ))?;
            let rows = stmt
                .query_map([post_id], comment_record_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_comment(&self, id: &str, text: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE comments SET text = ?2, updated_at = datetime('now') WHERE id = ?1",
                rusqlite::params![id, text],
            )?;
            Ok(())
        })
    }

    pub fn delete_comment(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

const USER_COLUMNS: &str =
    "id, first_name, last_name, full_name, username, email, password, role, created_at";

const OWNER_COLUMNS: &str = "u.id, u.first_name, u.last_name, u.full_name, u.username, u.email, \
     u.password, u.role, u.created_at";

const POST_COLUMNS: &str =
    "p.id, p.title, p.text, p.privacy, p.likes, p.dislikes, p.user_id, p.created_at, p.updated_at";

const COMMENT_COLUMNS: &str =
    "c.id, c.text, c.likes, c.dislikes, c.post_id, c.user_id, c.created_at, c.updated_at";

fn collect_posts(
    stmt: &mut rusqlite::Statement<'_>,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<PostRecord>> {
    let rows = stmt
        .query_map(params, post_record_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| user_from_row(row, 0))
        .optional()?;

    Ok(row)
}

fn user_from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(offset)?,
        first_name: row.get(offset + 1)?,
        last_name: row.get(offset + 2)?,
        full_name: row.get(offset + 3)?,
        username: row.get(offset + 4)?,
        email: row.get(offset + 5)?,
        password: row.get(offset + 6)?,
        role: row.get(offset + 7)?,
        created_at: row.get(offset + 8)?,
    })
}

fn post_record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRecord> {
    let post = PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        text: row.get(2)?,
        privacy: row.get(3)?,
        likes: row.get(4)?,
        dislikes: row.get(5)?,
        user_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    };
    let owner = user_from_row(row, 9)?;
    Ok(PostRecord { post, owner })
}

fn comment_record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentRecord> {
    let comment = CommentRow {
        id: row.get(0)?,
        text: row.get(1)?,
        likes: row.get(2)?,
        dislikes: row.get(3)?,
        post_id: row.get(4)?,
        user_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    };
    let owner = user_from_row(row, 8)?;
    Ok(CommentRecord { comment, owner })
}

/// Map a store error to the field whose UNIQUE index it violated, if any.
/// The handler-level pre-check is advisory; this is the real enforcement,
/// folded back into the same field-scoped validation response.
pub fn unique_violation(err: &anyhow::Error) -> Option<&'static str> {
    let sqlite = err.downcast_ref::<rusqlite::Error>()?;
    if let rusqlite::Error::SqliteFailure(code, Some(msg)) = sqlite {
        if code.code == rusqlite::ErrorCode::ConstraintViolation {
            if msg.contains("users.username") {
                return Some("username");
            }
            if msg.contains("users.email") {
                return Some("email");
            }
        }
    }
    None
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
