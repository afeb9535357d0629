/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use huddle_api::{app::{build_router, AppState}, config::Config};
/// use huddle_shared::db::pool::{create_pool, DatabaseConfig};
/// use huddle_shared::mail::LogMailer;
/// use huddle_shared::store::PgStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
///
/// let state = AppState::new(Arc::new(PgStore::new(pool)), Arc::new(LogMailer), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use crate::error::ApiError;
use crate::routes::{self, membership::{Games, Groups}};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use chrono::Duration;
use huddle_shared::auth::middleware::authenticate;
use huddle_shared::auth::password::HashParams;
use huddle_shared::mail::Mailer;
use huddle_shared::services::{IdentitySettings, Services};
use huddle_shared::store::Store;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Business logic over the store
    pub services: Services,

    /// Storage backend, used directly for health checks and auth lookups
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state with production password hashing
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        let settings = identity_settings(&config, HashParams::default());
        Self::with_settings(store, mailer, config, settings)
    }

    /// Creates application state with explicit identity settings
    pub fn with_settings(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        config: Config,
        settings: IdentitySettings,
    ) -> Self {
        Self {
            services: Services::new(store.clone(), mailer, settings),
            store,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Identity service settings derived from configuration
pub fn identity_settings(config: &Config, hash_params: HashParams) -> IdentitySettings {
    IdentitySettings {
        jwt_secret: config.jwt.secret.clone(),
        token_lifetime: Duration::days(config.jwt.expiration_days),
        reset_ttl: Duration::minutes(config.reset.ttl_minutes),
        public_url: config.api.public_url.clone(),
        hash_params,
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                              # Health check (public)
/// └── /api/v1/
///     ├── /auth/                           # Accounts (mixed)
///     │   ├── POST /register, /login, /forgotpassword
///     │   ├── PUT  /resetpassword/:token
///     │   └── me, updatedetails, updatepassword, groups, games (authenticated)
///     ├── /groups/                         # Reads public, writes authenticated
///     │   ├── /:id/request[/:request_id]   # Join requests (authenticated)
///     │   ├── /:id/users[/:user_id]        # Members (authenticated)
///     │   └── /:id/games                   # Games of a group
///     └── /games/                          # List public, rest authenticated
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    let auth = from_fn_with_state(state.clone(), jwt_auth_layer);

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/forgotpassword", post(routes::auth::forgot_password))
        .route("/resetpassword/:token", put(routes::auth::reset_password))
        .merge(
            Router::new()
                .route("/me", get(routes::auth::me))
                .route("/updatedetails", put(routes::auth::update_details))
                .route("/updatepassword", put(routes::auth::update_password))
                .route("/groups", get(routes::auth::my_groups))
                .route(
                    "/groups/:id",
                    get(routes::auth::my_group).delete(routes::auth::leave_group),
                )
                .route("/games", get(routes::auth::my_games))
                .route_layer(auth.clone()),
        );

    let group_routes = Router::new()
        .route(
            "/",
            get(routes::groups::list_groups)
                .merge(post(routes::groups::create_group).route_layer(auth.clone())),
        )
        .route(
            "/:id",
            get(routes::groups::get_group).merge(
                put(routes::groups::update_group)
                    .delete(routes::groups::delete_group)
                    .route_layer(auth.clone()),
            ),
        )
        .route(
            "/:id/games",
            get(routes::groups::list_group_games)
                .merge(post(routes::games::create_game).route_layer(auth.clone())),
        )
        .merge(membership_routes::<Groups>().route_layer(auth.clone()));

    let game_routes = Router::new()
        .route("/", get(routes::games::list_games))
        .merge(
            Router::new()
                .route(
                    "/:id",
                    get(routes::games::get_game)
                        .put(routes::games::update_game)
                        .delete(routes::games::delete_game),
                )
                .merge(membership_routes::<Games>())
                .route_layer(auth),
        );

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/groups", group_routes)
        .nest("/games", game_routes);

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .with_state(state)
}

/// Join request and member routes, identical for groups and games
fn membership_routes<K: routes::membership::Scope>() -> Router<AppState> {
    use routes::membership;

    Router::new()
        .route(
            "/:id/request",
            post(membership::request_join::<K>).get(membership::list_requests::<K>),
        )
        .route(
            "/:id/request/:request_id",
            get(membership::get_request::<K>)
                .put(membership::accept_request::<K>)
                .delete(membership::deny_request::<K>),
        )
        .route("/:id/users", get(membership::list_members::<K>))
        .route(
            "/:id/users/:user_id",
            get(membership::get_member::<K>).delete(membership::remove_member::<K>),
        )
}

/// Any origin when none are configured, otherwise exactly the listed ones
fn cors_layer(config: &Config) -> CorsLayer {
    let origins = &config.api.cors_origins;

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// JWT authentication middleware layer
///
/// Validates the bearer token, confirms the user still exists, then injects
/// `AuthContext` into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(req.headers(), state.jwt_secret())?;

    let user = state
        .store
        .find_user(auth_context.user_id)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    if user.is_none() {
        tracing::debug!(user_id = %auth_context.user_id, "Token for unknown user");
        return Err(ApiError::Unauthorized(
            "Not authorized to access this route".to_string(),
        ));
    }

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
