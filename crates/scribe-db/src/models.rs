/// Database row types; these map directly to SQLite rows.
/// Distinct from the scribe-types API models to keep the DB layer
/// independent.

pub struct UserRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub title: String,
    pub text: String,
    pub privacy: String,
    pub likes: i64,
    pub dislikes: i64,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub text: String,
    pub likes: i64,
    pub dislikes: i64,
    pub post_id: String,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A post joined with its owning user.
pub struct PostRecord {
    pub post: PostRow,
    pub owner: UserRow,
}

/// A comment joined with its owning user.
pub struct CommentRecord {
    pub comment: CommentRow,
    pub owner: UserRow,
}
