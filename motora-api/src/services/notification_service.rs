use chrono::Utc;
use diesel::prelude::*;
use socketioxide::SocketIo;
use uuid::Uuid;

use motora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{NewNotification, Notification};
use crate::schema::notifications;

/// Persist a notification and push it to the recipient's live sockets.
///
/// The insert is the durable part; the socket emit is fire-and-forget. A
/// recipient with no connected sockets simply misses the push and reads the
/// row on next page load.
pub fn notify(
    conn: &mut PgConnection,
    io: &SocketIo,
    user_id: Uuid,
    notification_type: &str,
    title: &str,
    body: &str,
    data: Option<serde_json::Value>,
    event: &str,
) -> AppResult<Notification> {
    let new_notification = NewNotification {
        user_id,
        notification_type: notification_type.to_string(),
        title: title.to_string(),
        body: body.to_string(),
        data,
    };

    let notification = diesel::insert_into(notifications::table)
        .values(&new_notification)
        .get_result::<Notification>(conn)?;

    push(io, user_id, event, &serde_json::json!({
        "id": notification.id,
        "type": notification.notification_type,
        "title": notification.title,
        "body": notification.body,
        "data": notification.data,
        "created_at": notification.created_at,
    }));

    tracing::debug!(
        notification_id = %notification.id,
        user_id = %user_id,
        notification_type = %notification_type,
        "notification created"
    );

    Ok(notification)
}

/// Emit an event to every socket in the recipient's room. Failures are
/// logged and swallowed; realtime delivery must never fail the caller.
pub fn push(io: &SocketIo, user_id: Uuid, event: &str, payload: &serde_json::Value) {
    let room = format!("user:{user_id}");
    if let Err(e) = io.to(room.clone()).emit(event.to_owned(), payload) {
        tracing::warn!(target_user = %user_id, room = %room, event = %event, error = %e, "socket emit failed");
    }
}

/// List notifications for a user with pagination.
pub fn list_notifications(
    conn: &mut PgConnection,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<Notification>, i64)> {
    let total: i64 = notifications::table
        .filter(notifications::user_id.eq(user_id))
        .count()
        .get_result(conn)?;

    let items = notifications::table
        .filter(notifications::user_id.eq(user_id))
        .order(notifications::created_at.desc())
        .limit(limit)
        .offset(offset)
        .load::<Notification>(conn)?;

    Ok((items, total))
}

/// Count unread notifications for a user.
pub fn count_unread(conn: &mut PgConnection, user_id: Uuid) -> AppResult<i64> {
    let count: i64 = notifications::table
        .filter(notifications::user_id.eq(user_id))
        .filter(notifications::is_read.eq(false))
        .count()
        .get_result(conn)?;

    Ok(count)
}

/// Mark all unread notifications as read for a user.
pub fn mark_all_read(conn: &mut PgConnection, user_id: Uuid) -> AppResult<usize> {
    let updated = diesel::update(
        notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::is_read.eq(false)),
    )
    .set((
        notifications::is_read.eq(true),
        notifications::read_at.eq(Utc::now()),
    ))
    .execute(conn)?;

    Ok(updated)
}

/// Mark a single notification as read (only if it belongs to the user).
pub fn mark_read(conn: &mut PgConnection, notification_id: Uuid, user_id: Uuid) -> AppResult<Notification> {
    let notification = diesel::update(
        notifications::table
            .filter(notifications::id.eq(notification_id))
            .filter(notifications::user_id.eq(user_id)),
    )
    .set((
        notifications::is_read.eq(true),
        notifications::read_at.eq(Utc::now()),
    ))
    .get_result::<Notification>(conn)
    .map_err(|e| match e {
        diesel::result::Error::NotFound => {
            AppError::new(ErrorCode::NotificationNotFound, "notification not found")
        }
        other => AppError::Database(other),
    })?;

    Ok(notification)
}
