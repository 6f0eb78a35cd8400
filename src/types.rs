//! Response shapes decoded from the GitHub REST API.
//!
//! Only the fields the summaries use are modelled. Missing fields fall back to
//! their defaults; GitHub omits or nulls several of them for deleted users and
//! empty repositories.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Commit {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommitDetail {
    pub message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub author: CommitAuthor,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommitAuthor {
    pub name: String,
    pub date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Branch {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RepoInfo {
    pub description: Option<String>,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub open_issues_count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PullRequest {
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user: PullRequestUser,
    pub html_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PullRequestUser {
    pub login: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Commit {
    /// First seven characters of the SHA, or the whole SHA when shorter.
    pub fn short_sha(&self) -> &str {
        match self.sha.char_indices().nth(7) {
            Some((idx, _)) => &self.sha[..idx],
            None => &self.sha,
        }
    }

    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.commit.message.lines().next().unwrap_or("")
    }
}
