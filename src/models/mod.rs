pub mod book;
pub mod library;
pub mod quote;
pub mod recommendation;
pub mod review;
pub mod social;
pub mod stats;
pub mod user;

pub use book::{Book, BookDetail};
pub use library::{LibraryEntry, ReadingStatus};
pub use quote::Quote;
pub use recommendation::{Recommendation, RecommendedBook};
pub use review::{Review, ReviewSort, ReviewThread};
pub use social::{ActivityKind, Friend, FriendRequest, Friendship, FriendshipStatus, UserActivity};
pub use stats::{GenreCount, ReadCount, ReadingStatistics, UserStats};
pub use user::User;
