use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Review, ReviewSort, ReviewThread},
    services::{catalog, users},
    stores::postgres::ReviewRecord,
};

const REVIEW_COLUMNS: &str =
    "r.id, r.book_id, r.user_id, u.username, r.text, r.parent_id, r.created_at";

/// Posts a review on a book, optionally as a reply to a root review
pub async fn add_review(
    pool: &PgPool,
    user_id: Uuid,
    book_id: Uuid,
    text: &str,
    parent_id: Option<Uuid>,
) -> AppResult<Review> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::InvalidInput(
            "Review text must not be empty".to_string(),
        ));
    }

    let user = users::require_user(pool, user_id).await?;
    catalog::require_book(pool, book_id).await?;

    if let Some(parent_id) = parent_id {
        let parent = find_review(pool, parent_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Parent review not found".to_string()))?;
        if parent.book_id != book_id {
            return Err(AppError::InvalidInput(
                "Parent review belongs to a different book".to_string(),
            ));
        }
    }

    let id = Uuid::new_v4();
    let created_at = chrono::Utc::now();
    sqlx::query(
        "INSERT INTO reviews (id, book_id, user_id, text, parent_id, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(book_id)
    .bind(user_id)
    .bind(text)
    .bind(parent_id)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(Review {
        id,
        book_id,
        user_id,
        username: user.username,
        text: text.to_string(),
        parent_id,
        created_at,
    })
}

/// Rewrites a review's text; only the author may edit
pub async fn edit_review(
    pool: &PgPool,
    user_id: Uuid,
    review_id: Uuid,
    text: &str,
) -> AppResult<Review> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::InvalidInput(
            "Review text must not be empty".to_string(),
        ));
    }

    let review = find_review(pool, review_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;
    if review.user_id != user_id {
        return Err(AppError::AccessDenied(
            "Only the author can edit a review".to_string(),
        ));
    }

    sqlx::query("UPDATE reviews SET text = $1 WHERE id = $2")
        .bind(text)
        .bind(review_id)
        .execute(pool)
        .await?;

    Ok(Review {
        text: text.to_string(),
        ..review
    })
}

/// Deletes a review and, through the schema, any replies under it
pub async fn delete_review(pool: &PgPool, user_id: Uuid, review_id: Uuid) -> AppResult<()> {
    let review = find_review(pool, review_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;
    if review.user_id != user_id {
        return Err(AppError::AccessDenied(
            "Only the author can delete a review".to_string(),
        ));
    }

    sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(review_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// A book's review threads: root reviews with their replies attached
///
/// Roots sort per the caller's choice; replies always read oldest first.
pub async fn threads_for_book(
    pool: &PgPool,
    book_id: Uuid,
    sort: ReviewSort,
) -> AppResult<Vec<ReviewThread>> {
    catalog::require_book(pool, book_id).await?;

    let order = match sort {
        ReviewSort::New => "DESC",
        ReviewSort::Old => "ASC",
    };
    let sql = format!(
        "SELECT {REVIEW_COLUMNS} \
         FROM reviews r JOIN users u ON u.id = r.user_id \
         WHERE r.book_id = $1 AND r.parent_id IS NULL \
         ORDER BY r.created_at {order}, r.id ASC"
    );
    let roots = sqlx::query_as::<_, ReviewRecord>(&sql)
        .bind(book_id)
        .fetch_all(pool)
        .await?;

    let sql = format!(
        "SELECT {REVIEW_COLUMNS} \
         FROM reviews r JOIN users u ON u.id = r.user_id \
         WHERE r.book_id = $1 AND r.parent_id IS NOT NULL \
         ORDER BY r.created_at ASC, r.id ASC"
    );
    let replies = sqlx::query_as::<_, ReviewRecord>(&sql)
        .bind(book_id)
        .fetch_all(pool)
        .await?;

    Ok(group_threads(
        roots.into_iter().map(|r| r.to_domain()).collect(),
        replies.into_iter().map(|r| r.to_domain()).collect(),
    ))
}

async fn find_review(pool: &PgPool, review_id: Uuid) -> AppResult<Option<Review>> {
    let sql = format!(
        "SELECT {REVIEW_COLUMNS} \
         FROM reviews r JOIN users u ON u.id = r.user_id \
         WHERE r.id = $1"
    );
    let record = sqlx::query_as::<_, ReviewRecord>(&sql)
        .bind(review_id)
        .fetch_optional(pool)
        .await?;

    Ok(record.map(|r| r.to_domain()))
}

/// Attaches replies to their roots, preserving both input orders
///
/// A reply whose root is gone (possible mid-delete) is dropped rather than
/// surfaced as an orphan thread.
fn group_threads(roots: Vec<Review>, replies: Vec<Review>) -> Vec<ReviewThread> {
    let mut by_parent: HashMap<Uuid, Vec<Review>> = HashMap::new();
    for reply in replies {
        if let Some(parent_id) = reply.parent_id {
            by_parent.entry(parent_id).or_default().push(reply);
        }
    }

    roots
        .into_iter()
        .map(|review| {
            let replies = by_parent.remove(&review.id).unwrap_or_default();
            ReviewThread {
                reply_count: replies.len(),
                review,
                replies,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn review(id: Uuid, parent_id: Option<Uuid>, minute: u32) -> Review {
        Review {
            id,
            book_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            username: "reader".to_string(),
            text: "text".to_string(),
            parent_id,
            created_at: Utc.with_ymd_and_hms(2026, 5, 1, 12, minute, 0).single().unwrap(),
        }
    }

    #[test]
    fn test_group_threads_counts_and_attaches_replies() {
        let root_a = Uuid::new_v4();
        let root_b = Uuid::new_v4();
        let roots = vec![review(root_a, None, 0), review(root_b, None, 1)];
        let replies = vec![
            review(Uuid::new_v4(), Some(root_a), 2),
            review(Uuid::new_v4(), Some(root_b), 3),
            review(Uuid::new_v4(), Some(root_a), 4),
        ];

        let threads = group_threads(roots, replies);

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].review.id, root_a);
        assert_eq!(threads[0].reply_count, 2);
        assert_eq!(threads[1].reply_count, 1);
        // Replies keep their oldest-first input order
        assert!(threads[0].replies[0].created_at < threads[0].replies[1].created_at);
    }

    #[test]
    fn test_group_threads_drops_orphan_replies() {
        let root = Uuid::new_v4();
        let roots = vec![review(root, None, 0)];
        let replies = vec![review(Uuid::new_v4(), Some(Uuid::new_v4()), 1)];

        let threads = group_threads(roots, replies);

        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].reply_count, 0);
    }

    #[test]
    fn test_group_threads_preserves_root_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let threads = group_threads(vec![review(first, None, 5), review(second, None, 0)], vec![]);

        assert_eq!(threads[0].review.id, first);
        assert_eq!(threads[1].review.id, second);
    }
}
