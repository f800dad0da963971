//! HTTP handlers for social-service.

pub mod auth;
pub mod follower;
pub mod health;
pub mod metrics;
pub mod session;
pub mod tag;
pub mod tweet;
pub mod user;

use service_core::error::AppError;

use crate::query::{Column, Direction, Filter, ListParams, ListQuery};

/// Paging from `params`, one OR-ed search filter per text column, newest
/// first. `id` breaks ties between rows created in the same instant so
/// pages never overlap.
fn newest_first<C: Column>(
    params: &ListParams,
    search_columns: &[C],
    created_at: C,
    id: C,
) -> Result<ListQuery<C>, AppError> {
    let mut query = ListQuery::new();
    if let Some(term) = params.search() {
        for column in search_columns {
            query = query.filter(Filter::search(*column, term)?);
        }
    }

    Ok(query
        .order_by(created_at, Direction::Desc)
        .order_by(id, Direction::Desc)
        .paginate(params.page(), params.limit()))
}
