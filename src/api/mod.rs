//! HTTP surface
//!
//! - `POST /generate-doc`         render one or more documents
//! - `GET  /download/:filename`   stream an artifact once, then delete it
//! - `GET  /downloads/:filename`  same as above
//! - `GET  /`                     banner

mod doc_routes;
mod error;
mod state;

pub use doc_routes::{create_doc_router, BatchGenerateResponse, GenerateResponse};
pub use error::{ApiError, ErrorResponse};
pub use state::AppState;
