use crate::{
    api::{config_request, leave_credit, leave_request},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Context, Result};
use std::sync::Arc;

type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiters, built once so every worker shares the same quota.
#[derive(Clone)]
pub struct RateLimiters {
    protected: Arc<Limiter>,
    batch: Arc<Limiter>,
}

impl RateLimiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            protected: Arc::new(
                build_limiter(config.rate_protected_per_min)
                    .context("RATE_PROTECTED_PER_MIN must be greater than 0")?,
            ),
            batch: Arc::new(
                build_limiter(config.rate_batch_per_min)
                    .context("RATE_BATCH_PER_MIN must be greater than 0")?,
            ),
        })
    }
}

fn build_limiter(requests_per_min: u32) -> Option<Limiter> {
    if requests_per_min == 0 {
        return None;
    }
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()?;
    Some(Governor::new(&cfg))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &RateLimiters) {
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(
                web::scope("/leave-credits")
                    // /leave-credits/reset
                    .service(
                        web::resource("/reset")
                            .wrap(limiters.batch.clone())
                            .route(web::post().to(leave_credit::reset_credits)),
                    )
                    // /leave-credits/{employee_id}
                    .service(
                        web::resource("/{employee_id}")
                            .route(web::get().to(leave_credit::credit_history)),
                    )
                    // /leave-credits/{employee_id}/{school_year}
                    .service(
                        web::resource("/{employee_id}/{school_year}")
                            .route(web::get().to(leave_credit::credit_balance)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    ),
            )
            .service(
                web::scope("/requests")
                    // /requests
                    .service(
                        web::resource("")
                            .route(web::get().to(config_request::list_requests))
                            .route(web::post().to(config_request::create_request)),
                    )
                    // /requests/{id}
                    .service(
                        web::resource("/{id}").route(web::get().to(config_request::get_request)),
                    )
                    .service(
                        web::resource("/{id}/assign")
                            .route(web::put().to(config_request::assign_request)),
                    )
                    .service(
                        web::resource("/{id}/start")
                            .route(web::put().to(config_request::start_request)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(config_request::approve_request)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(config_request::reject_request)),
                    )
                    .service(
                        web::resource("/{id}/complete")
                            .route(web::put().to(config_request::complete_request)),
                    ),
            ),
    );
}
