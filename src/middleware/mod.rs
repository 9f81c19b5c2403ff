pub mod auth;
pub mod request_id;

pub use auth::CurrentUser;
pub use request_id::{make_request_span, request_id_middleware, RequestId};
