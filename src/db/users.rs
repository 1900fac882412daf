use crate::db;
use crate::models::user::User;
use crate::schema::users;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error;
use uuid::Uuid;

#[derive(Insertable)]
#[diesel(table_name = users)]
struct NewUser<'a> {
    id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    name: &'a str,
}

pub fn create(conn: &mut PgConnection, name: &str) -> Result<User, Error> {
    let now = db::current_time();

    let new_user = NewUser {
        id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        name: name.trim(),
    };

    diesel::insert_into(users::table)
        .values(new_user)
        .get_result::<User>(conn)
}

pub fn find_by_name(conn: &mut PgConnection, name: &str) -> Result<Option<User>, Error> {
    users::table
        .filter(users::name.eq(name.trim()))
        .first::<User>(conn)
        .optional()
}

pub fn find_all(conn: &mut PgConnection) -> Result<Vec<User>, Error> {
    users::table.order(users::name.asc()).load::<User>(conn)
}

pub fn delete_all(conn: &mut PgConnection) -> Result<usize, Error> {
    diesel::delete(users::table).execute(conn)
}
