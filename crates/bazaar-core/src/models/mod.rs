pub mod ad;
pub mod user;

pub use ad::{
    AdContentUpdate, AdListing, AdSettings, AdSubmission, ApprovalInfo, ApprovalStatus,
    BusinessInfo, ContactInfo, LocationInfo, NewAd, PaymentStatus, ReactionGroup, Schedule,
    StoredImageRef, Visibility,
};
pub use user::{UserProfile, UserRole};
