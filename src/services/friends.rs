use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{ActivityKind, Friend, FriendRequest, Friendship, FriendshipStatus, UserActivity},
    services::users,
    stores::postgres::ActivityRecord,
};

/// A friendship row with both parties' usernames joined in
#[derive(sqlx::FromRow)]
struct FriendshipWithNames {
    id: Uuid,
    requester_id: Uuid,
    receiver_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    requester_username: String,
    receiver_username: String,
}

impl FriendshipWithNames {
    fn to_domain(&self) -> Friendship {
        Friendship {
            id: self.id,
            requester_id: self.requester_id,
            receiver_id: self.receiver_id,
            status: FriendshipStatus::from_str(&self.status).unwrap_or(FriendshipStatus::Pending),
            created_at: self.created_at,
        }
    }

    /// Username of the party that is not `user_id`
    fn counterpart_username(&self, user_id: Uuid) -> &str {
        if self.requester_id == user_id {
            &self.receiver_username
        } else {
            &self.requester_username
        }
    }
}

#[derive(sqlx::FromRow)]
struct FriendRequestRecord {
    friendship_id: Uuid,
    requester_id: Uuid,
    requester_username: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct FriendRecord {
    friendship_id: Uuid,
    user_id: Uuid,
    username: String,
}

/// Sends a friend request to another user by username
pub async fn send_request(
    pool: &PgPool,
    requester_id: Uuid,
    receiver_username: &str,
) -> AppResult<Friendship> {
    users::require_user(pool, requester_id).await?;

    let receiver = users::find_by_username(pool, receiver_username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if receiver.id == requester_id {
        return Err(AppError::InvalidInput(
            "You cannot send a friend request to yourself".to_string(),
        ));
    }

    let already_sent = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM friendships WHERE requester_id = $1 AND receiver_id = $2)",
    )
    .bind(requester_id)
    .bind(receiver.id)
    .fetch_one(pool)
    .await?;
    if already_sent {
        return Err(AppError::Conflict(
            "Friend request already sent".to_string(),
        ));
    }

    let friendship = Friendship {
        id: Uuid::new_v4(),
        requester_id,
        receiver_id: receiver.id,
        status: FriendshipStatus::Pending,
        created_at: Utc::now(),
    };
    sqlx::query(
        "INSERT INTO friendships (id, requester_id, receiver_id, status, created_at) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(friendship.id)
    .bind(friendship.requester_id)
    .bind(friendship.receiver_id)
    .bind(friendship.status.as_str())
    .bind(friendship.created_at)
    .execute(pool)
    .await?;

    record_activity(
        pool,
        requester_id,
        ActivityKind::FriendRequestSent,
        format!("Sent a friend request to {}", receiver.username),
    )
    .await?;

    tracing::info!(
        requester_id = %requester_id,
        receiver = %receiver.username,
        "Friend request sent"
    );
    Ok(friendship)
}

/// Accepts a pending request; only the receiver may accept
pub async fn accept_request(
    pool: &PgPool,
    user_id: Uuid,
    friendship_id: Uuid,
) -> AppResult<Friendship> {
    let record = find_with_names(pool, friendship_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Friend request not found".to_string()))?;

    if record.receiver_id != user_id {
        return Err(AppError::AccessDenied(
            "Only the receiver can accept a friend request".to_string(),
        ));
    }
    if record.to_domain().status != FriendshipStatus::Pending {
        return Err(AppError::Conflict(
            "Friend request already handled".to_string(),
        ));
    }

    sqlx::query("UPDATE friendships SET status = $1 WHERE id = $2")
        .bind(FriendshipStatus::Accepted.as_str())
        .bind(friendship_id)
        .execute(pool)
        .await?;

    record_activity(
        pool,
        record.receiver_id,
        ActivityKind::FriendRequestAccepted,
        format!("You are now friends with {}", record.requester_username),
    )
    .await?;
    record_activity(
        pool,
        record.requester_id,
        ActivityKind::FriendRequestAccepted,
        format!("{} accepted your friend request", record.receiver_username),
    )
    .await?;

    Ok(Friendship {
        status: FriendshipStatus::Accepted,
        ..record.to_domain()
    })
}

/// Rejects a pending request; only the receiver may reject
pub async fn reject_request(
    pool: &PgPool,
    user_id: Uuid,
    friendship_id: Uuid,
) -> AppResult<Friendship> {
    let record = find_with_names(pool, friendship_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Friend request not found".to_string()))?;

    if record.receiver_id != user_id {
        return Err(AppError::AccessDenied(
            "Only the receiver can reject a friend request".to_string(),
        ));
    }
    if record.to_domain().status != FriendshipStatus::Pending {
        return Err(AppError::Conflict(
            "Friend request already handled".to_string(),
        ));
    }

    sqlx::query("UPDATE friendships SET status = $1 WHERE id = $2")
        .bind(FriendshipStatus::Rejected.as_str())
        .bind(friendship_id)
        .execute(pool)
        .await?;

    Ok(Friendship {
        status: FriendshipStatus::Rejected,
        ..record.to_domain()
    })
}

/// Dissolves a friendship by its id; either party may end it
pub async fn remove_friend(pool: &PgPool, user_id: Uuid, friendship_id: Uuid) -> AppResult<()> {
    let record = find_with_names(pool, friendship_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Friendship not found".to_string()))?;

    delete_friendship(pool, user_id, record).await
}

/// Dissolves a friendship named by the other user's username, whichever
/// side originally sent the request
pub async fn remove_friend_by_username(
    pool: &PgPool,
    user_id: Uuid,
    other_username: &str,
) -> AppResult<()> {
    let other = users::find_by_username(pool, other_username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let record = sqlx::query_as::<_, FriendshipWithNames>(
        "SELECT f.id, f.requester_id, f.receiver_id, f.status, f.created_at, \
                ru.username AS requester_username, cu.username AS receiver_username \
         FROM friendships f \
         JOIN users ru ON ru.id = f.requester_id \
         JOIN users cu ON cu.id = f.receiver_id \
         WHERE (f.requester_id = $1 AND f.receiver_id = $2) \
            OR (f.requester_id = $2 AND f.receiver_id = $1) \
         ORDER BY f.created_at ASC LIMIT 1",
    )
    .bind(user_id)
    .bind(other.id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Friendship not found".to_string()))?;

    delete_friendship(pool, user_id, record).await
}

async fn delete_friendship(
    pool: &PgPool,
    user_id: Uuid,
    record: FriendshipWithNames,
) -> AppResult<()> {
    if record.requester_id != user_id && record.receiver_id != user_id {
        return Err(AppError::AccessDenied(
            "You are not part of this friendship".to_string(),
        ));
    }

    sqlx::query("DELETE FROM friendships WHERE id = $1")
        .bind(record.id)
        .execute(pool)
        .await?;

    let other_username = record.counterpart_username(user_id).to_string();
    let other_id = if record.requester_id == user_id {
        record.receiver_id
    } else {
        record.requester_id
    };
    let own_username = record.counterpart_username(other_id).to_string();

    record_activity(
        pool,
        user_id,
        ActivityKind::FriendRemoved,
        format!("You are no longer friends with {other_username}"),
    )
    .await?;
    record_activity(
        pool,
        other_id,
        ActivityKind::FriendRemoved,
        format!("You are no longer friends with {own_username}"),
    )
    .await?;

    Ok(())
}

async fn find_with_names(
    pool: &PgPool,
    friendship_id: Uuid,
) -> AppResult<Option<FriendshipWithNames>> {
    let record = sqlx::query_as::<_, FriendshipWithNames>(
        "SELECT f.id, f.requester_id, f.receiver_id, f.status, f.created_at, \
                ru.username AS requester_username, cu.username AS receiver_username \
         FROM friendships f \
         JOIN users ru ON ru.id = f.requester_id \
         JOIN users cu ON cu.id = f.receiver_id \
         WHERE f.id = $1",
    )
    .bind(friendship_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Pending requests waiting on this user, newest first
pub async fn incoming_requests(pool: &PgPool, user_id: Uuid) -> AppResult<Vec<FriendRequest>> {
    let records = sqlx::query_as::<_, FriendRequestRecord>(
        "SELECT f.id AS friendship_id, f.requester_id, \
                u.username AS requester_username, f.created_at \
         FROM friendships f JOIN users u ON u.id = f.requester_id \
         WHERE f.receiver_id = $1 AND f.status = $2 \
         ORDER BY f.created_at DESC",
    )
    .bind(user_id)
    .bind(FriendshipStatus::Pending.as_str())
    .fetch_all(pool)
    .await?;

    Ok(records
        .into_iter()
        .map(|r| FriendRequest {
            friendship_id: r.friendship_id,
            requester_id: r.requester_id,
            requester_username: r.requester_username,
            created_at: r.created_at,
        })
        .collect())
}

/// Confirmed friends, whichever side sent the original request
pub async fn friends_of(pool: &PgPool, user_id: Uuid) -> AppResult<Vec<Friend>> {
    let records = sqlx::query_as::<_, FriendRecord>(
        "SELECT f.id AS friendship_id, u.id AS user_id, u.username \
         FROM friendships f \
         JOIN users u ON u.id = CASE \
            WHEN f.requester_id = $1 THEN f.receiver_id ELSE f.requester_id END \
         WHERE f.status = $2 AND (f.requester_id = $1 OR f.receiver_id = $1) \
         ORDER BY u.username ASC",
    )
    .bind(user_id)
    .bind(FriendshipStatus::Accepted.as_str())
    .fetch_all(pool)
    .await?;

    Ok(records
        .into_iter()
        .map(|r| Friend {
            user_id: r.user_id,
            username: r.username,
            friendship_id: r.friendship_id,
        })
        .collect())
}

/// A user's activity feed, newest first
pub async fn activity_feed(pool: &PgPool, username: &str) -> AppResult<Vec<UserActivity>> {
    let user = users::find_by_username(pool, username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let records = sqlx::query_as::<_, ActivityRecord>(
        "SELECT id, user_id, kind, description, created_at \
         FROM user_activity WHERE user_id = $1 \
         ORDER BY created_at DESC, id ASC",
    )
    .bind(user.id)
    .fetch_all(pool)
    .await?;

    // Rows with kinds this version no longer knows are skipped, not errors
    Ok(records.into_iter().filter_map(|r| r.to_domain()).collect())
}

/// Appends one entry to a user's activity feed
pub(crate) async fn record_activity(
    pool: &PgPool,
    user_id: Uuid,
    kind: ActivityKind,
    description: String,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO user_activity (id, user_id, kind, description, created_at) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(kind.as_str())
    .bind(description)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(requester_id: Uuid, receiver_id: Uuid) -> FriendshipWithNames {
        FriendshipWithNames {
            id: Uuid::new_v4(),
            requester_id,
            receiver_id,
            status: "accepted".to_string(),
            created_at: Utc::now(),
            requester_username: "asker".to_string(),
            receiver_username: "answerer".to_string(),
        }
    }

    #[test]
    fn test_counterpart_username_picks_the_other_side() {
        let requester = Uuid::new_v4();
        let receiver = Uuid::new_v4();
        let record = record(requester, receiver);

        assert_eq!(record.counterpart_username(requester), "answerer");
        assert_eq!(record.counterpart_username(receiver), "asker");
    }

    #[test]
    fn test_unknown_status_reads_as_pending() {
        let mut rec = record(Uuid::new_v4(), Uuid::new_v4());
        rec.status = "vanished".to_string();
        assert_eq!(rec.to_domain().status, FriendshipStatus::Pending);
    }
}
