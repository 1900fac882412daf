use crate::models::post::Post;
use crate::schema::{feed_follows, feeds, posts};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error};
use uuid::Uuid;

#[derive(Insertable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = posts)]
pub struct NewPost {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub feed_id: Uuid,
}

/// Result of inserting a post. A post with the same `(feed_id, url)` pair
/// makes the insert a `Duplicate`; the stored post is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Created(Post),
    Duplicate,
}

pub fn create(conn: &mut PgConnection, new_post: &NewPost) -> Result<InsertOutcome, Error> {
    // savepoint, a failed insert must not abort an enclosing transaction
    let result = conn.transaction(|conn| {
        diesel::insert_into(posts::table)
            .values(new_post)
            .get_result::<Post>(conn)
    });

    match result {
        Ok(post) => Ok(InsertOutcome::Created(post)),
        Err(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            Ok(InsertOutcome::Duplicate)
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
pub fn find_by_feed(conn: &mut PgConnection, feed_id: Uuid) -> Result<Vec<Post>, Error> {
    posts::table
        .filter(posts::feed_id.eq(feed_id))
        .order(posts::created_at.asc())
        .load::<Post>(conn)
}

/// Posts from the feeds `user_id` follows. Most recently published first,
/// undated posts last.
pub fn find_recent_for_user(
    conn: &mut PgConnection,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<(Post, String)>, Error> {
    let followed_feed_ids = feed_follows::table
        .filter(feed_follows::user_id.eq(user_id))
        .select(feed_follows::feed_id);

    posts::table
        .inner_join(feeds::table)
        .filter(posts::feed_id.eq_any(followed_feed_ids))
        .select((posts::all_columns, feeds::name))
        .order((
            posts::published_at.desc().nulls_last(),
            posts::created_at.desc(),
        ))
        .limit(limit)
        .load::<(Post, String)>(conn)
}

pub fn delete_all(conn: &mut PgConnection) -> Result<usize, Error> {
    diesel::delete(posts::table).execute(conn)
}
