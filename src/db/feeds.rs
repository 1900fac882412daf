use crate::db;
use crate::models::feed::Feed;
use crate::schema::{feeds, users};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error;
use diesel::{ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl};
use uuid::Uuid;

#[derive(Insertable)]
#[diesel(table_name = feeds)]
struct NewFeed<'a> {
    id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    name: &'a str,
    url: &'a str,
    user_id: Uuid,
}

pub fn create(
    conn: &mut PgConnection,
    user_id: Uuid,
    name: &str,
    url: &str,
) -> Result<Feed, Error> {
    let now = db::current_time();

    let new_feed = NewFeed {
        id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        name: name.trim(),
        url: url.trim(),
        user_id,
    };

    diesel::insert_into(feeds::table)
        .values(new_feed)
        .get_result::<Feed>(conn)
}

/// The feed that was fetched the longest time ago. Feeds that were never
/// fetched come first.
pub fn find_next_to_fetch(conn: &mut PgConnection) -> Result<Option<Feed>, Error> {
    feeds::table
        .order((
            feeds::last_fetched_at.asc().nulls_first(),
            feeds::created_at.asc(),
            feeds::id.asc(),
        ))
        .first::<Feed>(conn)
        .optional()
}

pub fn mark_fetched(
    conn: &mut PgConnection,
    feed_id: Uuid,
    fetched_at: DateTime<Utc>,
) -> Result<usize, Error> {
    diesel::update(feeds::table.filter(feeds::id.eq(feed_id)))
        .set((
            feeds::last_fetched_at.eq(Some(fetched_at)),
            feeds::updated_at.eq(fetched_at),
        ))
        .execute(conn)
}

#[cfg(test)]
pub fn find(conn: &mut PgConnection, id: Uuid) -> Result<Option<Feed>, Error> {
    feeds::table
        .filter(feeds::id.eq(id))
        .first::<Feed>(conn)
        .optional()
}

pub fn find_by_url(conn: &mut PgConnection, url: &str) -> Result<Option<Feed>, Error> {
    feeds::table
        .filter(feeds::url.eq(url.trim()))
        .first::<Feed>(conn)
        .optional()
}

/// Every feed with the name of the user who added it.
pub fn find_all_with_owner(conn: &mut PgConnection) -> Result<Vec<(Feed, String)>, Error> {
    feeds::table
        .inner_join(users::table)
        .select((feeds::all_columns, users::name))
        .order(feeds::created_at.asc())
        .load::<(Feed, String)>(conn)
}

pub fn delete_all(conn: &mut PgConnection) -> Result<usize, Error> {
    diesel::delete(feeds::table).execute(conn)
}
