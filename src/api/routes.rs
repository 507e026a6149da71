//! # API Route Configuration
//!
//! This module sets up all the HTTP routes for the API.

use actix_web::web;

use super::handlers;

/// Configure all API routes.
///
/// This function is called from main.rs to set up
/// all the endpoint routes.
///
/// ## Route Structure
///
/// ```text
/// /
/// ├── /health                  GET - Health check
/// └── /api
///     ├── /investments
///     │   ├── ""               POST - Create investment
///     │   ├── /plans           GET  - List plans
///     │   └── /portfolio       GET  - Portfolio view (?userId=)
///     └── /admin
///         ├── /subscription-investments                GET - List
///         ├── /subscription-investments/:id/daily-return  PUT
///         ├── /subscription-investments/:id/status        PUT
///         ├── /investments/:id/manual-adjust              PUT
///         ├── /commissions                             GET - List
///         ├── /commissions/export.csv                  GET - CSV
///         ├── /commissions/:id/pay                     PUT - Payout
///         └── /settlement/run                          POST - Run pass
/// ```
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Root endpoint - API information
        .route("/", web::get().to(handlers::api_info))

        // Health check endpoint
        .route("/health", web::get().to(handlers::health_check))

        .service(
            web::scope("/api")
                // Client-facing investment endpoints
                .service(
                    web::scope("/investments")
                        // Create a new subscription investment
                        .route("", web::post().to(handlers::create_investment))

                        // List the available plans
                        .route("/plans", web::get().to(handlers::list_plans))

                        // Aggregated portfolio for one user
                        .route("/portfolio", web::get().to(handlers::get_portfolio)),
                )
                // Admin console endpoints
                .service(
                    web::scope("/admin")
                        // Paginated investment listing with derived fields
                        .route(
                            "/subscription-investments",
                            web::get().to(handlers::list_investments),
                        )

                        // Override the effective daily return for one record
                        .route(
                            "/subscription-investments/{id}/daily-return",
                            web::put().to(handlers::update_daily_return),
                        )

                        // Force a lifecycle transition
                        .route(
                            "/subscription-investments/{id}/status",
                            web::put().to(handlers::update_status),
                        )

                        // Set or clear the manual earnings adjustment
                        .route(
                            "/investments/{id}/manual-adjust",
                            web::put().to(handlers::manual_adjust),
                        )

                        // Paginated commission listing
                        .route("/commissions", web::get().to(handlers::list_commissions))

                        // CSV export (registered before the {id} routes so
                        // "export.csv" is never captured as an id)
                        .route(
                            "/commissions/export.csv",
                            web::get().to(handlers::export_commissions),
                        )

                        // Mark a pending commission as paid
                        .route(
                            "/commissions/{id}/pay",
                            web::put().to(handlers::pay_commission),
                        )

                        // Trigger a settlement pass on demand
                        .route(
                            "/settlement/run",
                            web::post().to(handlers::run_settlement),
                        ),
                ),
        );
}
