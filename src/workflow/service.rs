use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use super::effects::SideEffects;
use super::notify::Notifier;
use crate::error::AppError;
use crate::model::config_request::{ConfigurationRequest, NewConfigurationRequest, RequestAction};
use crate::store::{Page, RequestFilter, RequestStore};

/// HR → MIS configuration request state machine.
pub struct RequestWorkflow<S, E, N> {
    store: Arc<S>,
    effects: Arc<E>,
    notifier: Arc<N>,
}

fn not_found(request_id: u64) -> AppError {
    AppError::not_found(format!("configuration request {request_id}"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl<S, E, N> RequestWorkflow<S, E, N>
where
    S: RequestStore,
    E: SideEffects,
    N: Notifier,
{
    pub fn new(store: Arc<S>, effects: Arc<E>, notifier: Arc<N>) -> Self {
        Self {
            store,
            effects,
            notifier,
        }
    }

    #[instrument(skip(self, request), fields(request_type = %request.details.request_type()))]
    pub async fn create_request(
        &self,
        request: NewConfigurationRequest,
    ) -> Result<ConfigurationRequest, AppError> {
        request.validate()?;
        let created = self.store.insert_request(request).await?;
        info!(request_id = created.id, "Configuration request created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn assign_request(
        &self,
        request_id: u64,
        assigned_to: u64,
    ) -> Result<ConfigurationRequest, AppError> {
        let request = self
            .store
            .update_request(request_id, |request| {
                request.transition(RequestAction::Assign, Utc::now())?;
                request.assigned_to = Some(assigned_to);
                Ok(())
            })
            .await?;

        info!("Configuration request assigned");
        self.notify_quietly(
            assigned_to,
            format!("Configuration request #{} \"{}\" was assigned to you", request.id, request.title),
        )
        .await;
        Ok(request)
    }

    #[instrument(skip(self))]
    pub async fn start_request(&self, request_id: u64) -> Result<ConfigurationRequest, AppError> {
        let request = self
            .store
            .update_request(request_id, |request| {
                request.transition(RequestAction::Start, Utc::now())
            })
            .await?;
        info!("Configuration request in progress");
        Ok(request)
    }

    /// Run the request's side effect, then commit the approval. The request row
    /// stays locked meanwhile, so the effect runs at most once per approval and
    /// a failed effect leaves the request in its current state.
    #[instrument(skip(self, review_notes))]
    pub async fn approve_request(
        &self,
        request_id: u64,
        reviewer_id: u64,
        review_notes: Option<String>,
    ) -> Result<ConfigurationRequest, AppError> {
        let review_notes = non_blank(review_notes);
        let approved = self
            .store
            .update_request_with(
                request_id,
                |request| {
                    request.transition(RequestAction::Approve, Utc::now())?;
                    request.reviewed_by = Some(reviewer_id);
                    request.review_notes = review_notes;
                    Ok(())
                },
                async |request: &ConfigurationRequest| {
                    self.effects.apply(request).await.map_err(|e| {
                        warn!(error = %e, request_type = %request.request_type, "Side effect failed");
                        match e {
                            AppError::SideEffectFailed(message) => {
                                AppError::SideEffectFailed(message)
                            }
                            other => AppError::SideEffectFailed(other.to_string()),
                        }
                    })
                },
            )
            .await?;

        info!("Configuration request approved");
        self.notify_quietly(
            approved.requester_id,
            format!("Your configuration request #{} \"{}\" was approved", approved.id, approved.title),
        )
        .await;
        Ok(approved)
    }

    #[instrument(skip(self, rejection_reason))]
    pub async fn reject_request(
        &self,
        request_id: u64,
        reviewer_id: u64,
        rejection_reason: &str,
    ) -> Result<ConfigurationRequest, AppError> {
        let reason = rejection_reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("A rejection reason is required"));
        }

        let rejected = self
            .store
            .update_request(request_id, |request| {
                request.transition(RequestAction::Reject, Utc::now())?;
                request.reviewed_by = Some(reviewer_id);
                request.rejection_reason = Some(reason.to_string());
                Ok(())
            })
            .await?;

        info!("Configuration request rejected");
        self.notify_quietly(
            rejected.requester_id,
            format!(
                "Your configuration request #{} \"{}\" was rejected: {}",
                rejected.id, rejected.title, reason
            ),
        )
        .await;
        Ok(rejected)
    }

    #[instrument(skip(self, completion_note))]
    pub async fn complete_request(
        &self,
        request_id: u64,
        completion_note: Option<String>,
    ) -> Result<ConfigurationRequest, AppError> {
        let completion_note = non_blank(completion_note);
        let completed = self
            .store
            .update_request(request_id, |request| {
                let now = Utc::now();
                request.transition(RequestAction::Complete, now)?;
                request.completion_note = completion_note;
                request.completed_at = Some(now);
                Ok(())
            })
            .await?;

        info!("Configuration request completed");
        self.notify_quietly(
            completed.requester_id,
            format!("Your configuration request #{} \"{}\" is completed", completed.id, completed.title),
        )
        .await;
        Ok(completed)
    }

    pub async fn get_request(&self, request_id: u64) -> Result<ConfigurationRequest, AppError> {
        self.store
            .find_request(request_id)
            .await?
            .ok_or_else(|| not_found(request_id))
    }

    pub async fn list_requests(
        &self,
        filter: RequestFilter,
    ) -> Result<Page<ConfigurationRequest>, AppError> {
        self.store.list_requests(&filter.normalized()).await
    }

    async fn notify_quietly(&self, user_id: u64, message: String) {
        if let Err(e) = self.notifier.notify(user_id, &message).await {
            warn!(error = %e, user_id, "Notification not delivered");
        }
    }
}
