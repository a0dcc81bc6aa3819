use std::time::Instant;

use chrono::Utc;

use crate::{
    api::{self, ApiClient, FetchPolicy},
    domain::{HealthReport, HealthStatus, PullRequest, PullRequestSnapshot},
    jobs::{PendingJob, PollScheduler},
};

pub const REST_STATUS_CHECKING: &str = "checking...";

/// Display state of one request cycle.
#[derive(Clone, Debug)]
pub enum QueryState<T> {
    Loading,
    Failed(String),
    Ready(T),
}

// -----------------------------------------------------------------------------
// Health
// -----------------------------------------------------------------------------

/// Both health indicators, fed by a single check issued on mount.
pub struct HealthPanel {
    rest_status: String,
    api: QueryState<HealthStatus>,
    pending_job: Option<PendingJob<HealthReport>>,
}

impl HealthPanel {
    pub fn mount(client: ApiClient) -> Self {
        let job = PendingJob::spawn("health", move |token| api::check_health(&client, token));
        Self {
            rest_status: REST_STATUS_CHECKING.to_owned(),
            api: QueryState::Loading,
            pending_job: Some(job),
        }
    }

    pub fn poll_job(&mut self) {
        let Some(job) = &self.pending_job else {
            return;
        };
        let Some(result) = job.try_take() else {
            return;
        };
        self.pending_job = None;
        match result {
            Ok(report) => {
                log::debug!("Health check completed at {}", report.checked_at);
                self.rest_status = report.rest_status;
                self.api = match report.api {
                    Ok(status) => QueryState::Ready(status),
                    Err(err) => QueryState::Failed(err),
                };
            }
            Err(err) => {
                log::warn!("Health check worker failed: {err}");
                self.rest_status = api::STATUS_DISCONNECTED.to_owned();
                self.api = QueryState::Failed(err.to_string());
            }
        }
    }

    pub fn rest_status(&self) -> &str {
        &self.rest_status
    }

    pub fn api(&self) -> &QueryState<HealthStatus> {
        &self.api
    }
}

// -----------------------------------------------------------------------------
// Pull requests
// -----------------------------------------------------------------------------

pub struct PullRequestPanel {
    api: ApiClient,
    state: QueryState<PullRequestSnapshot>,
    pending_job: Option<PendingJob<Vec<PullRequest>>>,
    scheduler: PollScheduler,
}

impl PullRequestPanel {
    /// Issues the first query straight away.
    pub fn mount(api: ApiClient, scheduler: PollScheduler, now: Instant) -> Self {
        let mut panel = Self {
            api,
            state: QueryState::Loading,
            pending_job: None,
            scheduler,
        };
        panel.start_query(now);
        panel
    }

    /// Manual refresh. Supersedes a query that is still in flight.
    pub fn refresh(&mut self, now: Instant) {
        if self.pending_job.is_some() {
            log::debug!("Manual refresh supersedes the in-flight pull request query");
        }
        self.start_query(now);
    }

    /// Collects a finished query and starts the next one once it is due.
    pub fn tick(&mut self, now: Instant) {
        self.poll_job();
        if self.pending_job.is_none() && self.scheduler.is_due(now) {
            self.start_query(now);
        }
    }

    pub fn state(&self) -> &QueryState<PullRequestSnapshot> {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.pending_job.is_some()
    }

    fn start_query(&mut self, now: Instant) {
        let api = self.api.clone();
        self.state = QueryState::Loading;
        self.scheduler.mark_triggered(now);
        // Replacing the job drops, and so cancels, any earlier one.
        self.pending_job = Some(PendingJob::spawn("pull request", move |token| {
            token.check()?;
            api.open_pull_requests(FetchPolicy::NetworkOnly)
        }));
    }

    fn poll_job(&mut self) {
        let Some(job) = &self.pending_job else {
            return;
        };
        let Some(result) = job.try_take() else {
            return;
        };
        self.pending_job = None;
        match result {
            Ok(pull_requests) => {
                self.scheduler.record_success();
                log::debug!("Fetched {} open pull requests", pull_requests.len());
                self.state = QueryState::Ready(PullRequestSnapshot {
                    pull_requests,
                    fetched_at: Utc::now(),
                });
            }
            Err(err) => {
                self.scheduler.record_failure();
                log::warn!("Failed to load pull requests: {err}");
                self.state = QueryState::Failed(err.to_string());
            }
        }
    }
}
