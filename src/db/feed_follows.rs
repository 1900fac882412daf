use crate::db;
use crate::models::feed::Feed;
use crate::models::feed_follow::FeedFollow;
use crate::schema::{feed_follows, feeds};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error;
use uuid::Uuid;

#[derive(Insertable)]
#[diesel(table_name = feed_follows)]
struct NewFeedFollow {
    id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_id: Uuid,
    feed_id: Uuid,
}

pub fn create(
    conn: &mut PgConnection,
    user_id: Uuid,
    feed_id: Uuid,
) -> Result<FeedFollow, Error> {
    let now = db::current_time();

    let new_follow = NewFeedFollow {
        id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        user_id,
        feed_id,
    };

    diesel::insert_into(feed_follows::table)
        .values(new_follow)
        .get_result::<FeedFollow>(conn)
}

pub fn delete_by_user_and_url(
    conn: &mut PgConnection,
    user_id: Uuid,
    url: &str,
) -> Result<usize, Error> {
    let feed_ids = feeds::table
        .filter(feeds::url.eq(url.trim()))
        .select(feeds::id);

    let record_query = feed_follows::table
        .filter(feed_follows::user_id.eq(user_id))
        .filter(feed_follows::feed_id.eq_any(feed_ids));

    diesel::delete(record_query).execute(conn)
}

pub fn find_feeds_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<Vec<Feed>, Error> {
    let feed_ids = feed_follows::table
        .filter(feed_follows::user_id.eq(user_id))
        .select(feed_follows::feed_id);

    feeds::table
        .filter(feeds::id.eq_any(feed_ids))
        .order(feeds::name.asc())
        .get_results::<Feed>(conn)
}
