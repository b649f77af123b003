pub mod auth;
pub mod favorites;
pub mod inquiries;
pub mod reviews;

pub use auth::{AuthApi, AuthResponse, Credentials, ProfileUpdate, Registration, Role, User};
pub use favorites::{Favorite, FavoritesApi};
pub use inquiries::{InquiriesApi, Inquiry, NewInquiry};
pub use reviews::{PropertyReviews, Review, ReviewContent, ReviewsApi};
