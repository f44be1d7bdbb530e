//! HTTP surface for job specs.
//!
//! | route | |
//! |---|---|
//! | `GET /specs` | paged list of live V1 jobs |
//! | `POST /specs` | create a V1 job from JSON |
//! | `POST /specs/v2` | create a V2 job from TOML |
//! | `GET /specs/{id}` | show a V1 job |
//! | `DELETE /specs/{id}` | archive a V1 job |
//! | `DELETE /specs/v2/{id}` | delete a V2 job |

mod error;
mod pagination;
mod routes;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use error::ApiError;
pub use pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageParams};
pub use routes::router;

/// Serve `router` on `listener` until `cancel` fires.
pub async fn serve(listener: TcpListener, router: Router, cancel: CancellationToken) -> std::io::Result<()> {
  info!(addr = %listener.local_addr()?, "listening");
  axum::serve(listener, router)
    .with_graceful_shutdown(async move { cancel.cancelled().await })
    .await
}
