/// HTTP surface
///
/// Thin handlers: decode input, check capability, call the domain
/// managers, encode output. All state flows through [`AppContext`].
pub mod auth;
pub mod cards;
pub mod cloud;
pub mod quizzes;
pub mod storage;
pub mod users;

use crate::context::AppContext;
use axum::Router;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(cards::routes())
        .merge(quizzes::routes())
        .merge(cloud::routes())
        .merge(storage::routes())
}
