use augur_store::SortOrder;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Raw `page`, `size` and `sort` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  pub page: Option<String>,
  pub size: Option<String>,
  pub sort: Option<String>,
}

/// A parsed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub page: u32,
  pub size: u32,
  pub order: SortOrder,
}

impl Page {
  pub fn offset(&self) -> u32 {
    (self.page - 1).saturating_mul(self.size)
  }

  /// `links` object with `prev` and `next` where they exist.
  pub fn links(&self, base: &str, total: u64) -> Value {
    let mut links = serde_json::Map::new();
    if self.page > 1 {
      links.insert("prev".to_string(), json!(self.href(base, self.page - 1)));
    }
    if u64::from(self.page) * u64::from(self.size) < total {
      links.insert("next".to_string(), json!(self.href(base, self.page + 1)));
    }
    Value::Object(links)
  }

  fn href(&self, base: &str, page: u32) -> String {
    format!("{}?page={}&size={}&sort={}", base, page, self.size, self.order)
  }
}

impl TryFrom<PageParams> for Page {
  type Error = ApiError;

  fn try_from(params: PageParams) -> Result<Self, ApiError> {
    let page = match params.page.as_deref() {
      None | Some("") => 1,
      Some(text) => text
        .parse::<u32>()
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| ApiError::unprocessable(format!("invalid page '{}'", text)))?,
    };
    let size = match params.size.as_deref() {
      None | Some("") => DEFAULT_PAGE_SIZE,
      Some(text) => text
        .parse::<u32>()
        .ok()
        .filter(|s| *s > 0)
        .ok_or_else(|| ApiError::unprocessable(format!("invalid size '{}'", text)))?
        .min(MAX_PAGE_SIZE),
    };
    let order = SortOrder::from(params.sort.as_deref().unwrap_or_default());
    Ok(Page { page, size, order })
  }
}
