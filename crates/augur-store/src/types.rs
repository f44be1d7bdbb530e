use std::fmt;

use augur_job::JobSpecV2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Sort direction for job listings, on `createdAt`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  #[default]
  Ascending,
  Descending,
}

impl SortOrder {
  pub(crate) fn as_sql(&self) -> &'static str {
    match self {
      SortOrder::Ascending => "ASC",
      SortOrder::Descending => "DESC",
    }
  }
}

impl From<&str> for SortOrder {
  /// `-createdAt` sorts descending. Anything else sorts ascending.
  fn from(s: &str) -> Self {
    match s {
      "-createdAt" => SortOrder::Descending,
      _ => SortOrder::Ascending,
    }
  }
}

impl fmt::Display for SortOrder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SortOrder::Ascending => f.write_str("createdAt"),
      SortOrder::Descending => f.write_str("-createdAt"),
    }
  }
}

/// A registered external adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bridge {
  pub name: String,
  pub url: Url,
  pub created_at: DateTime<Utc>,
}

impl Bridge {
  /// Bridge names are stored lowercased.
  pub fn new(name: &str, url: Url, created_at: DateTime<Utc>) -> Self {
    Self {
      name: name.to_lowercase(),
      url,
      created_at,
    }
  }
}

/// A registered external initiator. Jobs started by it are announced to
/// `url` before they are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalInitiator {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<Url>,
  /// Credentials sent along with every job notice.
  pub outgoing_token: String,
  #[serde(skip_serializing)]
  pub outgoing_secret: String,
  pub created_at: DateTime<Utc>,
}

impl ExternalInitiator {
  /// Names are stored lowercased.
  pub fn new(
    name: &str,
    url: Option<Url>,
    outgoing_token: &str,
    outgoing_secret: &str,
    created_at: DateTime<Utc>,
  ) -> Self {
    Self {
      name: name.to_lowercase(),
      url,
      outgoing_token: outgoing_token.to_string(),
      outgoing_secret: outgoing_secret.to_string(),
      created_at,
    }
  }
}

/// A stored V2 job with its assigned id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecordV2 {
  pub id: i32,
  #[serde(flatten)]
  pub spec: JobSpecV2,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sort_order_parse() {
    assert_eq!(SortOrder::from(""), SortOrder::Ascending);
    assert_eq!(SortOrder::from("createdAt"), SortOrder::Ascending);
    assert_eq!(SortOrder::from("-createdAt"), SortOrder::Descending);
    assert_eq!(SortOrder::from("name"), SortOrder::Ascending);
    assert_eq!(SortOrder::from("-name"), SortOrder::Ascending);
  }
}
