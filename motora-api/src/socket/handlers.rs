use serde::Serialize;
use socketioxide::extract::SocketRef;
use uuid::Uuid;

use motora_shared::middleware::validate_jwt;
use motora_shared::types::auth::AuthUser;

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

fn get_user_id(socket: &SocketRef) -> Option<Uuid> {
    socket.extensions.get::<Uuid>()
}

/// Bearer auth at connect time: Authorization header, or a `token` query
/// parameter for browser clients that cannot set headers on the handshake.
fn authenticate_socket(socket: &SocketRef) -> Result<AuthUser, String> {
    let parts = socket.req_parts();

    let token = parts
        .headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| {
            parts.uri.query().and_then(|q| {
                q.split('&')
                    .find_map(|kv| kv.strip_prefix("token=").map(str::to_string))
            })
        })
        .ok_or_else(|| "missing token".to_string())?;

    let claims = validate_jwt(&token).map_err(|e| e.to_string())?;
    if claims.is_expired() {
        return Err("token expired".to_string());
    }

    Ok(AuthUser::from(claims))
}

pub async fn on_connect(socket: SocketRef) {
    let user = match authenticate_socket(&socket) {
        Ok(user) => user,
        Err(msg) => {
            tracing::warn!(error = %msg, "socket auth failed");
            let _ = socket.emit(
                "error",
                &ErrorPayload {
                    code: "AUTH_FAILED".into(),
                    message: msg,
                },
            );
            socket.disconnect().ok();
            return;
        }
    };
    let user_id = user.id;

    // Store user_id in socket extensions
    socket.extensions.insert(user_id);

    // Join the per-user room; every connected socket of this user receives
    // pushes addressed to them. Room membership is the presence record: an
    // emit to an empty room is simply dropped and the persisted notification
    // row is the durable fallback.
    let user_room = format!("user:{user_id}");
    socket.join(user_room).ok();

    tracing::info!(user_id = %user_id, sid = %socket.id, "socket connected");

    let _ = socket.emit("connected", &serde_json::json!({ "user_id": user_id }));

    socket.on_disconnect(|socket: SocketRef| async move {
        if let Some(user_id) = get_user_id(&socket) {
            tracing::info!(user_id = %user_id, sid = %socket.id, "socket disconnected");
        }
    });
}
