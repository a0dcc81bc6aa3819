use chrono::{DateTime, Utc};
use serde::Deserialize;

// Domain data structures shared across modules.

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: PullRequestState,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_login: String,
    pub user_avatar_url: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub head_branch: String,
    pub base_branch: String,
}

impl PullRequest {
    pub fn repo_full_name(&self) -> String {
        format!("{}/{}", self.repo_owner, self.repo_name)
    }

    pub fn number_label(&self) -> String {
        format!("#{}", self.number)
    }

    pub fn branch_label(&self) -> String {
        format!("{} → {}", self.head_branch, self.base_branch)
    }

    pub fn author_label(&self) -> String {
        format!("by {}", self.user_login)
    }

    /// Creation date as "Mar 5, 2024".
    pub fn created_label(&self) -> String {
        self.created_at.format("%b %-d, %Y").to_string()
    }

    pub fn updated_label(&self) -> String {
        self.updated_at.format("%Y-%m-%d %H:%M").to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

impl PullRequestState {
    pub fn label(&self) -> &'static str {
        match self {
            PullRequestState::Open => "Open",
            PullRequestState::Closed => "Closed",
            PullRequestState::Merged => "Merged",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PullRequestSnapshot {
    pub pull_requests: Vec<PullRequest>,
    pub fetched_at: DateTime<Utc>,
}

impl PullRequestSnapshot {
    pub fn count_banner(&self) -> String {
        count_banner(self.pull_requests.len())
    }
}

pub fn count_banner(count: usize) -> String {
    let suffix = if count == 1 { "" } else { "s" };
    format!("{count} open pull request{suffix}")
}

/// Result of the structured `health`/`version` query.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub health: String,
    pub version: String,
}

/// One health check, shared by both status indicators.
#[derive(Clone, Debug)]
pub struct HealthReport {
    pub rest_status: String,
    pub api: Result<HealthStatus, String>,
    pub checked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PullRequest {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "number": 42,
            "title": "Fix bug",
            "state": "open",
            "htmlUrl": "http://localhost:3001/acme/api/pulls/42",
            "createdAt": "2024-03-05T00:00:00Z",
            "updatedAt": "2024-03-06T12:30:00Z",
            "userLogin": "bot",
            "userAvatarUrl": "http://localhost:3001/avatars/bot",
            "repoOwner": "acme",
            "repoName": "api",
            "headBranch": "fix/bug",
            "baseBranch": "main"
        }))
        .expect("valid pull request")
    }

    #[test]
    fn card_labels_match_expected_text() {
        let pr = sample();
        assert_eq!(pr.repo_full_name(), "acme/api");
        assert_eq!(pr.number_label(), "#42");
        assert_eq!(pr.branch_label(), "fix/bug → main");
        assert_eq!(pr.author_label(), "by bot");
        assert_eq!(pr.created_label(), "Mar 5, 2024");
        assert_eq!(pr.state, PullRequestState::Open);
    }

    #[test]
    fn created_label_normalizes_offsets_to_utc() {
        let created: DateTime<Utc> =
            serde_json::from_value(serde_json::json!("2024-12-01T01:00:00+02:00"))
                .expect("offset timestamp");
        let pr = PullRequest {
            created_at: created,
            ..sample()
        };
        assert_eq!(pr.created_label(), "Nov 30, 2024");
    }

    #[test]
    fn count_banner_pluralizes() {
        assert_eq!(count_banner(1), "1 open pull request");
        assert_eq!(count_banner(2), "2 open pull requests");
        assert_eq!(count_banner(0), "0 open pull requests");
    }

    #[test]
    fn unknown_state_is_rejected() {
        let result = serde_json::from_value::<PullRequestState>(serde_json::json!("draft"));
        assert!(result.is_err());
    }
}
