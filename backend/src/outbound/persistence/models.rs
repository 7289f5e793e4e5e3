//! Diesel row structs. Internal to the persistence adapters.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{queue_messages, users};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub external_credential_id: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub username: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = queue_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct QueueMessageRow {
    pub id: Uuid,
    pub body: String,
    pub receipt_handle: Option<Uuid>,
    pub receive_count: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = queue_messages)]
pub(crate) struct NewQueueMessageRow<'a> {
    pub id: Uuid,
    pub queue_name: &'a str,
    pub body: &'a str,
    pub visible_at: DateTime<Utc>,
    pub enqueued_at: DateTime<Utc>,
}
