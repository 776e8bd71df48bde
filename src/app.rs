use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post, put, MethodRouter},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, ServerConfig};
use crate::database::entity::Entity;
use crate::database::models::privilege::{ACTION_READ, ACTION_WRITE};
use crate::database::models::{Article, Category, Contact, Content, Job};
use crate::handlers::{audit_log, entity, health, role};
use crate::middleware::{jwt_auth_middleware, require_privilege};
use crate::services::{AuditService, EntityService, RoleService};

/// Shared by every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        Self { pool, config: Arc::new(config) }
    }

    pub fn audit(&self) -> AuditService {
        AuditService::new(self.pool.clone(), self.config.audit_log.enabled)
    }

    pub fn entities<T: Entity>(&self) -> EntityService<T> {
        EntityService::new(self.pool.clone(), self.config.search.clone())
    }

    pub fn roles(&self) -> RoleService {
        RoleService::new(self.pool.clone(), self.config.role.clone(), self.config.search.clone())
    }
}

pub fn build_router(state: AppState) -> Router {
    let mut protected = Router::new()
        .merge(entity_routes::<Article>(&state, "articles", ":id"))
        .merge(entity_routes::<Content>(&state, "contents", ":id/:lang"))
        .merge(entity_routes::<Category>(&state, "categories", ":id"))
        .merge(entity_routes::<Contact>(&state, "contacts", ":id"))
        .merge(entity_routes::<Job>(&state, "jobs", ":id"))
        .merge(role_routes(&state))
        .merge(audit_log_routes(&state))
        .route("/my-privileges", get(role::my_privileges));

    if state.config.security.skip {
        tracing::warn!("security.skip is on: authentication and authorization are disabled");
    } else {
        protected = protected.route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware));
    }

    Router::new()
        .route("/health", get(health::health))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.server)),
        )
        .with_state(state)
}

/// Requires `action` on `module` for the wrapped methods
fn guard(
    state: &AppState,
    route: MethodRouter<AppState>,
    module: &'static str,
    action: i32,
) -> MethodRouter<AppState> {
    if state.config.security.skip {
        return route;
    }
    route.route_layer(middleware::from_fn_with_state(state.clone(), require_privilege(module, action)))
}

fn entity_routes<T: Entity>(state: &AppState, plural: &str, key: &str) -> Router<AppState> {
    let module = T::MODULE;
    Router::new()
        .route(&format!("/{}", plural), guard(state, post(entity::create::<T>), module, ACTION_WRITE))
        .route(
            &format!("/{}/search", plural),
            guard(state, get(entity::search_get::<T>).post(entity::search_post::<T>), module, ACTION_READ),
        )
        .route(
            &format!("/{}/{}", plural, key),
            guard(state, get(entity::load::<T>), module, ACTION_READ).merge(guard(
                state,
                put(entity::update::<T>).patch(entity::patch::<T>).delete(entity::delete::<T>),
                module,
                ACTION_WRITE,
            )),
        )
}

fn role_routes(state: &AppState) -> Router<AppState> {
    const MODULE: &str = "role";
    Router::new()
        .route(
            "/roles",
            guard(state, get(role::codes), "user", ACTION_READ)
                .merge(guard(state, post(role::create), MODULE, ACTION_WRITE)),
        )
        .route(
            "/roles/search",
            guard(state, get(role::search_get).post(role::search_post), MODULE, ACTION_READ),
        )
        .route(
            "/roles/:role_id",
            guard(state, get(role::load), MODULE, ACTION_READ).merge(guard(
                state,
                put(role::update).patch(role::patch).delete(role::delete),
                MODULE,
                ACTION_WRITE,
            )),
        )
        .route("/roles/:role_id/assign", guard(state, put(role::assign), MODULE, ACTION_WRITE))
        .route("/roles/:role_id/users", guard(state, get(role::users), MODULE, ACTION_READ))
        .route("/privileges", guard(state, get(role::privileges), MODULE, ACTION_READ))
}

fn audit_log_routes(state: &AppState) -> Router<AppState> {
    const MODULE: &str = "audit_log";
    let search = || get(audit_log::search_get).post(audit_log::search_post);
    Router::new()
        .route("/audit-logs", guard(state, search(), MODULE, ACTION_READ))
        .route("/audit-logs/search", guard(state, search(), MODULE, ACTION_READ))
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    if !server.enable_cors {
        return CorsLayer::new();
    }
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if server.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
