use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::future::Future;
use std::pin::Pin;

use super::auth::AuthUser;
use crate::app::AppState;
use crate::database::models::privilege;
use crate::database::role_adapter::module_masks;
use crate::error::ApiError;

type AuthorizeFuture = Pin<Box<dyn Future<Output = Result<Response, ApiError>> + Send>>;

/// Route layer that lets the request through only when the authenticated
/// user's active roles grant `action` on `module`.
///
/// ```ignore
/// get(handler).route_layer(middleware::from_fn_with_state(
///     state.clone(),
///     require_privilege("article", ACTION_READ),
/// ))
/// ```
pub fn require_privilege(
    module: &'static str,
    action: i32,
) -> impl Fn(State<AppState>, Request, Next) -> AuthorizeFuture + Clone {
    move |State(state): State<AppState>, req: Request, next: Next| {
        Box::pin(async move {
            let user = req
                .extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

            let masks = module_masks(&state.pool, &user.user_id, module).await?;
            if !privilege::allows(&masks, action) {
                tracing::warn!(
                    user_id = %user.user_id,
                    username = %user.username,
                    module,
                    action,
                    "permission denied"
                );
                return Err(ApiError::forbidden(format!("No {} permission on {}", action_name(action), module)));
            }

            Ok(next.run(req).await)
        })
    }
}

fn action_name(action: i32) -> &'static str {
    match action {
        privilege::ACTION_READ => "read",
        privilege::ACTION_WRITE => "write",
        privilege::ACTION_APPROVE => "approve",
        _ => "required",
    }
}
