use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a friend request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
    Blocked,
}

impl FriendshipStatus {
    /// Stable string form used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
            FriendshipStatus::Rejected => "rejected",
            FriendshipStatus::Blocked => "blocked",
        }
    }

    /// Parses the stable string form; unknown values yield None
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(FriendshipStatus::Pending),
            "accepted" => Some(FriendshipStatus::Accepted),
            "rejected" => Some(FriendshipStatus::Rejected),
            "blocked" => Some(FriendshipStatus::Blocked),
            _ => None,
        }
    }
}

/// A directed friendship edge from requester to receiver
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Friendship {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub receiver_id: Uuid,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
}

/// An incoming friend request as shown to the receiver
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FriendRequest {
    pub friendship_id: Uuid,
    pub requester_id: Uuid,
    pub requester_username: String,
    pub created_at: DateTime<Utc>,
}

/// A confirmed friend, direction of the original request erased
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Friend {
    pub user_id: Uuid,
    pub username: String,
    pub friendship_id: Uuid,
}

/// What kind of event an activity row records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    FriendRequestSent,
    FriendRequestAccepted,
    FriendRemoved,
    QuoteAdded,
    QuoteDeleted,
    ProfileUpdated,
}

impl ActivityKind {
    /// Stable string form used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::FriendRequestSent => "friend_request_sent",
            ActivityKind::FriendRequestAccepted => "friend_request_accepted",
            ActivityKind::FriendRemoved => "friend_removed",
            ActivityKind::QuoteAdded => "quote_added",
            ActivityKind::QuoteDeleted => "quote_deleted",
            ActivityKind::ProfileUpdated => "profile_updated",
        }
    }

    /// Parses the stable string form; unknown values yield None
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "friend_request_sent" => Some(ActivityKind::FriendRequestSent),
            "friend_request_accepted" => Some(ActivityKind::FriendRequestAccepted),
            "friend_removed" => Some(ActivityKind::FriendRemoved),
            "quote_added" => Some(ActivityKind::QuoteAdded),
            "quote_deleted" => Some(ActivityKind::QuoteDeleted),
            "profile_updated" => Some(ActivityKind::ProfileUpdated),
            _ => None,
        }
    }
}

/// An append-only feed entry on a user's profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserActivity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: ActivityKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friendship_status_round_trips_db_form() {
        for status in [
            FriendshipStatus::Pending,
            FriendshipStatus::Accepted,
            FriendshipStatus::Rejected,
            FriendshipStatus::Blocked,
        ] {
            assert_eq!(FriendshipStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_activity_kind_serialization() {
        let json = serde_json::to_string(&ActivityKind::FriendRequestSent).unwrap();
        assert_eq!(json, "\"friend_request_sent\"");
    }
}
