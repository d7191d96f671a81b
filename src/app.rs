use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, Uri},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::{AppConfig, SecurityConfig};
use crate::database::store::DocumentStore;
use crate::error::ApiError;
use crate::handlers;
use crate::middleware::{rate_limit, RateLimiter};
use crate::services::{Geocoder, Mailer};

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub geocoder: Arc<dyn Geocoder>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        geocoder: Arc<dyn Geocoder>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self { config: Arc::new(config), store, geocoder, mailer }
    }
}

/// Full application router: `/api/v1` routes plus the boundary layers.
pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    let api = Router::new()
        .route("/health", get(handlers::health::check))
        .merge(auth_routes())
        .merge(bootcamp_routes())
        .merge(course_routes())
        .merge(review_routes())
        .merge(user_routes());

    let mut app = Router::new()
        .nest("/api/v1", api)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.api.enable_rate_limiting {
        app = app.layer(from_fn_with_state(RateLimiter::from_config(&config.api), rate_limit));
    }

    let security_headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("0"),
        ));
    app = app.layer(security_headers);

    if config.security.enable_cors {
        app = app.layer(cors_layer(&config.security));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    let allow_origin = if origins.is_empty() { AllowOrigin::any() } else { AllowOrigin::list(origins) };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {} not found", uri.path()))
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", get(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/updatedetails", put(auth::update_details))
        .route("/auth/updatepassword", put(auth::update_password))
        .route("/auth/forgotpassword", post(auth::forgot_password))
        .route("/auth/resetpassword/:resettoken", put(auth::reset_password))
}

fn bootcamp_routes() -> Router<AppState> {
    use handlers::{bootcamps, courses, reviews};

    Router::new()
        .route("/bootcamps", get(bootcamps::list).post(bootcamps::create))
        .route(
            "/bootcamps/:id",
            get(bootcamps::get).put(bootcamps::update).delete(bootcamps::delete),
        )
        .route("/bootcamps/radius/:zipcode/:distance", get(bootcamps::within_radius))
        .route("/bootcamps/:id/photo", put(bootcamps::upload_photo))
        // nested resources share the bootcamp id segment
        .route("/bootcamps/:id/courses", get(courses::list_for_bootcamp).post(courses::create))
        .route("/bootcamps/:id/reviews", get(reviews::list_for_bootcamp).post(reviews::create))
}

fn course_routes() -> Router<AppState> {
    use handlers::courses;

    Router::new()
        .route("/courses", get(courses::list))
        .route("/courses/:id", get(courses::get).put(courses::update).delete(courses::delete))
}

fn review_routes() -> Router<AppState> {
    use handlers::reviews;

    Router::new()
        .route("/reviews", get(reviews::list))
        .route("/reviews/:id", get(reviews::get).put(reviews::update).delete(reviews::delete))
}

fn user_routes() -> Router<AppState> {
    use handlers::users;

    Router::new()
        .route("/users", get(users::list).post(users::create))
        .route("/users/:id", get(users::get).put(users::update).delete(users::delete))
}
