//! Display text for the dashboard.
//!
//! Built from panel state each frame so `app.rs` only lays widgets out.

use crate::{
    domain::{HealthStatus, PullRequest, PullRequestSnapshot},
    panels::QueryState,
};

pub const LOADING_PULL_REQUESTS: &str = "Loading pull requests...";
pub const NO_PULL_REQUESTS: &str = "No open pull requests found.";
pub const API_LOADING: &str = "Loading...";
pub const API_UNREACHABLE: &str = "Error connecting to API";

pub fn rest_status_line(status: &str) -> String {
    format!("REST API: {status}")
}

/// Structured health indicator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiHealthView {
    pub lines: Vec<String>,
    pub is_error: bool,
}

impl ApiHealthView {
    pub fn from_state(state: &QueryState<HealthStatus>) -> Self {
        match state {
            QueryState::Loading => Self {
                lines: vec![API_LOADING.to_owned()],
                is_error: false,
            },
            QueryState::Failed(_) => Self {
                lines: vec![API_UNREACHABLE.to_owned()],
                is_error: true,
            },
            QueryState::Ready(status) => Self {
                lines: vec![
                    format!("API Status: {}", status.health),
                    format!("Version: {}", status.version),
                ],
                is_error: false,
            },
        }
    }
}

/// Body of the pull request section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PullRequestListView {
    Loading,
    Failed(String),
    Empty {
        synced: String,
    },
    Cards {
        synced: String,
        banner: String,
        cards: Vec<PullRequestCard>,
    },
}

impl PullRequestListView {
    pub fn from_state(state: &QueryState<PullRequestSnapshot>) -> Self {
        match state {
            QueryState::Loading => Self::Loading,
            QueryState::Failed(err) => Self::Failed(format!("Error loading pull requests: {err}")),
            QueryState::Ready(snapshot) => {
                let synced = synced_line(snapshot);
                if snapshot.pull_requests.is_empty() {
                    return Self::Empty { synced };
                }
                Self::Cards {
                    synced,
                    banner: snapshot.count_banner(),
                    cards: snapshot
                        .pull_requests
                        .iter()
                        .map(PullRequestCard::from_pull_request)
                        .collect(),
                }
            }
        }
    }

    pub fn cards(&self) -> &[PullRequestCard] {
        match self {
            Self::Cards { cards, .. } => cards,
            _ => &[],
        }
    }
}

fn synced_line(snapshot: &PullRequestSnapshot) -> String {
    format!(
        "Last synced {} UTC",
        snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Pre-formatted text for one pull request card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequestCard {
    pub id: u64,
    pub title: String,
    pub html_url: String,
    pub avatar_url: String,
    pub user_login: String,
    pub state: &'static str,
    pub repo: String,
    pub number: String,
    pub branch: String,
    pub author: String,
    pub opened: String,
    pub updated: String,
}

impl PullRequestCard {
    fn from_pull_request(pr: &PullRequest) -> Self {
        Self {
            id: pr.id,
            title: pr.title.clone(),
            html_url: pr.html_url.clone(),
            avatar_url: pr.user_avatar_url.clone(),
            user_login: pr.user_login.clone(),
            state: pr.state.label(),
            repo: pr.repo_full_name(),
            number: pr.number_label(),
            branch: pr.branch_label(),
            author: pr.author_label(),
            opened: format!("opened {}", pr.created_label()),
            updated: format!("updated {} UTC", pr.updated_label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::api::testing::pull_request_json;

    fn snapshot(titles: &[&str]) -> PullRequestSnapshot {
        let pull_requests = titles
            .iter()
            .zip(1..)
            .map(|(title, id)| {
                serde_json::from_value(pull_request_json(id, title)).expect("pull request")
            })
            .collect();
        PullRequestSnapshot {
            pull_requests,
            fetched_at: Utc.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn rest_line_shows_status_verbatim() {
        assert_eq!(rest_status_line("healthy"), "REST API: healthy");
        assert_eq!(rest_status_line("disconnected"), "REST API: disconnected");
    }

    #[test]
    fn api_health_covers_each_state() {
        let loading = ApiHealthView::from_state(&QueryState::Loading);
        assert_eq!(loading.lines, ["Loading..."]);
        assert!(!loading.is_error);

        let failed = ApiHealthView::from_state(&QueryState::Failed("timeout".into()));
        assert_eq!(failed.lines, ["Error connecting to API"]);
        assert!(failed.is_error);

        let ready = ApiHealthView::from_state(&QueryState::Ready(HealthStatus {
            health: "ok".into(),
            version: "1.2.0".into(),
        }));
        assert_eq!(ready.lines, ["API Status: ok", "Version: 1.2.0"]);
        assert!(!ready.is_error);
    }

    #[test]
    fn loading_list_has_no_cards() {
        let view = PullRequestListView::from_state(&QueryState::Loading);
        assert_eq!(view, PullRequestListView::Loading);
        assert!(view.cards().is_empty());
        assert_eq!(LOADING_PULL_REQUESTS, "Loading pull requests...");
    }

    #[test]
    fn failure_text_carries_the_error() {
        let view = PullRequestListView::from_state(&QueryState::Failed(
            "backend returned HTTP 502".into(),
        ));
        assert_eq!(
            view,
            PullRequestListView::Failed(
                "Error loading pull requests: backend returned HTTP 502".into()
            )
        );
        assert!(view.cards().is_empty());
    }

    #[test]
    fn empty_snapshot_renders_zero_cards() {
        let view = PullRequestListView::from_state(&QueryState::Ready(snapshot(&[])));
        assert_eq!(
            view,
            PullRequestListView::Empty {
                synced: "Last synced 2024-03-05 09:30:00 UTC".into()
            }
        );
        assert!(view.cards().is_empty());
        assert_eq!(NO_PULL_REQUESTS, "No open pull requests found.");
    }

    #[test]
    fn one_card_per_pull_request_in_order() {
        let view = PullRequestListView::from_state(&QueryState::Ready(snapshot(&[
            "Update serde",
            "Update tokio",
            "Pin actions",
        ])));
        let PullRequestListView::Cards { banner, cards, .. } = &view else {
            panic!("expected cards, got {view:?}");
        };
        assert_eq!(banner, "3 open pull requests");
        assert_eq!(cards.len(), 3);
        let titles: Vec<_> = cards.iter().map(|card| card.title.as_str()).collect();
        assert_eq!(titles, ["Update serde", "Update tokio", "Pin actions"]);
    }

    #[test]
    fn card_text_matches_pull_request() {
        let view = PullRequestListView::from_state(&QueryState::Ready(snapshot(&["Update serde"])));
        let card = &view.cards()[0];
        assert_eq!(card.id, 1);
        assert_eq!(card.state, "Open");
        assert_eq!(card.repo, "acme/api");
        assert_eq!(card.number, "#41");
        assert_eq!(card.branch, "renovate/dep-1 → main");
        assert_eq!(card.author, "by renovate");
        assert_eq!(card.opened, "opened Mar 5, 2024");
        assert_eq!(card.updated, "updated 2024-03-05 00:00 UTC");
        assert_eq!(card.html_url, "http://localhost:3001/acme/api/pulls/41");
    }
}
