//! Workflow tests against in-memory fakes of the store, storage and
//! gateway seams.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use bazaar_core::models::{
    AdListing, AdSettings, AdSubmission, ApprovalInfo, ApprovalStatus, BusinessInfo, ContactInfo,
    LocationInfo, NewAd, PaymentStatus, ReactionGroup, Schedule, StoredImageRef, UserProfile,
    UserRole, Visibility,
};
use bazaar_core::{AppError, StorageBackend};
use bazaar_db::{AdStore, UserDirectory};
use bazaar_payments::{
    CheckoutRequest, CheckoutSession, EventKind, GatewayError, PaymentGateway, PriceEntry,
    PricingSource, WebhookEvent,
};
use bazaar_processing::ImageValidator;
use bazaar_services::{
    AdPublicationService, ExpirySweeper, ImageUpload, PaymentEventService, PublicationConfig,
    PublishError,
};
use bazaar_storage::{ImageStore, StorageError, StorageResult};

const WORLDWIDE: &str = "Sri Lankan Worldwide Restaurant";

struct FakeUsers {
    user: Option<UserProfile>,
}

#[async_trait]
impl UserDirectory for FakeUsers {
    async fn find_active(&self, id: Uuid) -> Result<Option<UserProfile>, AppError> {
        Ok(self.user.clone().filter(|u| u.id == id))
    }
}

#[derive(Default)]
struct FakeAds {
    rows: Mutex<HashMap<Uuid, AdListing>>,
    inserts: AtomicUsize,
    deletes: AtomicUsize,
}

impl FakeAds {
    fn listing(&self, id: Uuid) -> Option<AdListing> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    fn approve(&self, id: Uuid) {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&id).unwrap();
        row.approval.status = ApprovalStatus::Approved;
        if row.payment_status == PaymentStatus::Paid {
            row.visibility = Visibility::Visible;
        }
    }
}

fn listing_from(ad: &NewAd) -> AdListing {
    let now = Utc::now();
    AdListing {
        id: Uuid::new_v4(),
        owner_id: ad.owner_id,
        shop_name: ad.shop_name.clone(),
        contact: ad.contact.clone(),
        location: ad.location.clone(),
        business: ad.business.clone(),
        schedule: ad.schedule.clone(),
        settings: ad.settings,
        video_url: ad.video_url.clone(),
        images: Vec::new(),
        approval: ApprovalInfo::default(),
        payment_status: PaymentStatus::Pending,
        visibility: Visibility::Hidden,
        payment_session_id: None,
        likes: ReactionGroup::default(),
        unlikes: ReactionGroup::default(),
        recommendations: ReactionGroup::default(),
        version: 1,
        expires_at: ad.expires_at,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl AdStore for FakeAds {
    async fn insert(&self, ad: &NewAd) -> Result<AdListing, AppError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let listing = listing_from(ad);
        self.rows
            .lock()
            .unwrap()
            .insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn get(&self, id: Uuid) -> Result<Option<AdListing>, AppError> {
        Ok(self.listing(id))
    }

    async fn set_images(&self, id: Uuid, images: &[StoredImageRef]) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("ad".to_string()))?;
        row.images = images.to_vec();
        Ok(())
    }

    async fn set_payment_session(&self, id: Uuid, session_id: &str) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("ad".to_string()))?;
        row.payment_session_id = Some(session_id.to_string());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().unwrap().remove(&id).is_some())
    }

    async fn find_by_payment_session(
        &self,
        session_id: &str,
    ) -> Result<Option<AdListing>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|r| r.payment_session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn record_payment_completed(
        &self,
        session_id: &str,
    ) -> Result<Option<AdListing>, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .values_mut()
            .find(|r| r.payment_session_id.as_deref() == Some(session_id));
        Ok(row.map(|r| {
            r.payment_status = PaymentStatus::Paid;
            if r.approval.status == ApprovalStatus::Approved {
                r.visibility = Visibility::Visible;
            }
            r.clone()
        }))
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<AdListing>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                r.expires_at < now
                    && r.visibility == Visibility::Hidden
                    && !r.settings.is_promoted()
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct FakeImages {
    uploads: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    fail_uploads: AtomicBool,
}

#[async_trait]
impl ImageStore for FakeImages {
    async fn upload(
        &self,
        ad_id: Uuid,
        filename: &str,
        _content_type: &str,
        _data: Vec<u8>,
    ) -> StorageResult<StoredImageRef> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed("store offline".to_string()));
        }
        let key = format!("ads/{}/{}", ad_id, filename);
        self.uploads.lock().unwrap().push(key.clone());
        Ok(StoredImageRef {
            url: format!("http://images.test/{}", key),
            delete_handle: key,
        })
    }

    async fn delete(&self, delete_handle: &str) -> StorageResult<()> {
        self.deleted.lock().unwrap().push(delete_handle.to_string());
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

struct FakePricing {
    entries: Vec<PriceEntry>,
    fail: AtomicBool,
}

#[async_trait]
impl PricingSource for FakePricing {
    async fn list_active_prices(&self) -> Result<Vec<PriceEntry>, GatewayError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 500,
                message: "catalog down".to_string(),
            });
        }
        Ok(self.entries.clone())
    }
}

#[derive(Default)]
struct FakeGateway {
    fail: AtomicBool,
    calls: AtomicUsize,
    last_request: Mutex<Option<CheckoutRequest>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 502,
                message: "gateway down".to_string(),
            });
        }
        Ok(CheckoutSession {
            session_id: format!("cs_test_{}", request.ad_id.simple()),
            checkout_url: "https://checkout.test/session".to_string(),
        })
    }
}

struct Harness {
    users_id: Uuid,
    ads: Arc<FakeAds>,
    images: Arc<FakeImages>,
    pricing: Arc<FakePricing>,
    gateway: Arc<FakeGateway>,
    service: AdPublicationService,
}

fn catalog() -> Vec<PriceEntry> {
    vec![
        PriceEntry {
            price_id: "price_base".to_string(),
            product_name: "base_price".to_string(),
            amount_minor: 1500,
        },
        PriceEntry {
            price_id: "price_top".to_string(),
            product_name: "top_add_price".to_string(),
            amount_minor: 3000,
        },
        PriceEntry {
            price_id: "price_carousel".to_string(),
            product_name: "carosal_add_price".to_string(),
            amount_minor: 2500,
        },
    ]
}

fn harness(entries: Vec<PriceEntry>) -> Harness {
    let user_id = Uuid::new_v4();
    let now = Utc::now();
    let users = Arc::new(FakeUsers {
        user: Some(UserProfile {
            id: user_id,
            email: "owner@example.com".to_string(),
            first_name: Some("Nimal".to_string()),
            last_name: Some("Perera".to_string()),
            role: UserRole::User,
            is_active: true,
            created_at: now,
            updated_at: now,
        }),
    });
    let ads = Arc::new(FakeAds::default());
    let images = Arc::new(FakeImages::default());
    let pricing = Arc::new(FakePricing {
        entries,
        fail: AtomicBool::new(false),
    });
    let gateway = Arc::new(FakeGateway::default());
    let service = AdPublicationService::new(
        users,
        ads.clone(),
        images.clone(),
        pricing.clone(),
        gateway.clone(),
        ImageValidator::new(
            5 * 1024 * 1024,
            vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            vec!["image/jpeg".to_string(), "image/png".to_string()],
        ),
        None,
        PublicationConfig {
            currency: "usd".to_string(),
            worldwide_category: WORLDWIDE.to_string(),
            retention_days: 31,
        },
    );
    Harness {
        users_id: user_id,
        ads,
        images,
        pricing,
        gateway,
        service,
    }
}

fn submission(featured: bool, carousel: bool) -> AdSubmission {
    AdSubmission {
        shop_name: "Spice Garden".to_string(),
        contact: ContactInfo {
            address: None,
            phone: "+94112223344".to_string(),
            whatsapp: None,
            email: None,
            website: None,
        },
        location: LocationInfo {
            google_map_location: None,
            latitude: Some(6.9271),
            longitude: Some(79.8612),
            city: "Colombo".to_string(),
            district: None,
            province: None,
            country: Some("Sri Lanka".to_string()),
            state: None,
        },
        business: BusinessInfo {
            category: "Restaurant".to_string(),
            specialty: None,
            tags: Vec::new(),
            halal_available: false,
            description: Some("Family restaurant".to_string()),
            menu_options: Vec::new(),
        },
        schedule: Schedule::default(),
        ad_settings: AdSettings {
            featured,
            carousel,
            has_halal: false,
        },
        video_url: None,
    }
}

fn png_upload(name: &str) -> ImageUpload {
    let mut bytes = Vec::new();
    image::RgbaImage::new(16, 16)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    ImageUpload {
        filename: name.to_string(),
        content_type: "image/png".to_string(),
        data: bytes,
    }
}

#[tokio::test]
async fn test_happy_path_creates_hidden_ad_awaiting_payment() {
    let h = harness(catalog());

    let outcome = h
        .service
        .publish(
            h.users_id,
            submission(false, false),
            vec![png_upload("front.png"), png_upload("menu.png")],
            None,
        )
        .await
        .unwrap();

    assert_eq!(outcome.image_urls.len(), 2);
    assert_eq!(outcome.checkout_url, "https://checkout.test/session");

    let row = h.ads.listing(outcome.ad_id).unwrap();
    assert_eq!(row.payment_session_id.as_deref(), Some(outcome.session_id.as_str()));
    assert_eq!(row.approval.status, ApprovalStatus::Pending);
    assert_eq!(row.payment_status, PaymentStatus::Pending);
    assert_eq!(row.visibility, Visibility::Hidden);
    assert_eq!(row.images.len(), 2);

    let request = h.gateway.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.price_ids, vec!["price_base"]);
    assert_eq!(request.amount_minor, 1500);
    assert_eq!(request.customer_email, "owner@example.com");
}

#[tokio::test]
async fn test_promoted_listing_prices_both_placements() {
    let h = harness(catalog());

    h.service
        .publish(h.users_id, submission(true, true), Vec::new(), None)
        .await
        .unwrap();

    let request = h.gateway.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.price_ids, vec!["price_top", "price_carousel"]);
    assert_eq!(request.amount_minor, 5500);
}

#[tokio::test]
async fn test_gateway_failure_rolls_back_row_and_images() {
    let h = harness(catalog());
    h.gateway.fail.store(true, Ordering::SeqCst);

    let err = h
        .service
        .publish(
            h.users_id,
            submission(false, false),
            vec![png_upload("front.png")],
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::PaymentInitiationFailed(_)));
    assert!(h.ads.rows.lock().unwrap().is_empty());
    assert_eq!(h.ads.deletes.load(Ordering::SeqCst), 1);

    let uploaded = h.images.uploads.lock().unwrap().clone();
    let deleted = h.images.deleted.lock().unwrap().clone();
    assert_eq!(uploaded.len(), 1);
    assert_eq!(deleted, uploaded);
}

#[tokio::test]
async fn test_empty_catalog_persists_nothing() {
    let h = harness(Vec::new());

    let err = h
        .service
        .publish(
            h.users_id,
            submission(false, false),
            vec![png_upload("front.png")],
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::NoPricingAvailable(_)));
    assert_eq!(h.ads.inserts.load(Ordering::SeqCst), 0);
    assert!(h.images.uploads.lock().unwrap().is_empty());
    assert_eq!(h.gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_catalog_outage_fails_before_any_side_effect() {
    let h = harness(catalog());
    h.pricing.fail.store(true, Ordering::SeqCst);

    let err = h
        .service
        .publish(
            h.users_id,
            submission(false, false),
            vec![png_upload("front.png")],
            None,
        )
        .await
        .unwrap_err();

    // Nothing was persisted and no checkout was attempted, so this is a
    // creation failure, not a payment one.
    assert!(matches!(err, PublishError::CreationFailed(_)));
    assert_eq!(h.ads.inserts.load(Ordering::SeqCst), 0);
    assert!(h.images.uploads.lock().unwrap().is_empty());
    assert_eq!(h.gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_submitter_rejected_before_any_side_effect() {
    let h = harness(catalog());

    let err = h
        .service
        .publish(Uuid::new_v4(), submission(false, false), Vec::new(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Unauthorized(_)));
    assert_eq!(h.ads.inserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_submission_rejected() {
    let h = harness(catalog());
    let mut bad = submission(false, false);
    bad.shop_name = String::new();

    let err = h
        .service
        .publish(h.users_id, bad, Vec::new(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::InvalidInput(_)));
    assert_eq!(h.ads.inserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_images_skipped_not_fatal() {
    let h = harness(catalog());

    let outcome = h
        .service
        .publish(
            h.users_id,
            submission(false, false),
            vec![
                ImageUpload {
                    filename: "malware.exe".to_string(),
                    content_type: "application/octet-stream".to_string(),
                    data: vec![0u8; 64],
                },
                png_upload("front.png"),
            ],
            None,
        )
        .await
        .unwrap();

    assert_eq!(outcome.image_urls.len(), 1);
}

#[tokio::test]
async fn test_unreachable_image_store_still_publishes() {
    let h = harness(catalog());
    h.images.fail_uploads.store(true, Ordering::SeqCst);

    let outcome = h
        .service
        .publish(
            h.users_id,
            submission(false, false),
            vec![png_upload("front.png")],
            None,
        )
        .await
        .unwrap();

    assert!(outcome.image_urls.is_empty());
    assert!(h.ads.listing(outcome.ad_id).is_some());
}

#[tokio::test]
async fn test_completed_payment_without_approval_stays_hidden() {
    let h = harness(catalog());
    let outcome = h
        .service
        .publish(h.users_id, submission(false, false), Vec::new(), None)
        .await
        .unwrap();

    let events = PaymentEventService::new(h.ads.clone(), h.images.clone());
    events
        .handle(WebhookEvent {
            kind: EventKind::CheckoutCompleted,
            session_id: Some(outcome.session_id.clone()),
        })
        .await
        .unwrap();

    let row = h.ads.listing(outcome.ad_id).unwrap();
    assert_eq!(row.payment_status, PaymentStatus::Paid);
    assert_eq!(row.visibility, Visibility::Hidden);

    // Approval is the second half of the conjunction.
    h.ads.approve(outcome.ad_id);
    let row = h.ads.listing(outcome.ad_id).unwrap();
    assert_eq!(row.visibility, Visibility::Visible);
}

#[tokio::test]
async fn test_expired_checkout_discards_listing_and_images() {
    let h = harness(catalog());
    let outcome = h
        .service
        .publish(
            h.users_id,
            submission(false, false),
            vec![png_upload("front.png")],
            None,
        )
        .await
        .unwrap();

    let events = PaymentEventService::new(h.ads.clone(), h.images.clone());
    events
        .handle(WebhookEvent {
            kind: EventKind::CheckoutExpired,
            session_id: Some(outcome.session_id),
        })
        .await
        .unwrap();

    assert!(h.ads.listing(outcome.ad_id).is_none());
    assert_eq!(h.images.deleted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_event_is_ignored() {
    let h = harness(catalog());
    let events = PaymentEventService::new(h.ads.clone(), h.images.clone());

    events
        .handle(WebhookEvent {
            kind: EventKind::Other("invoice.created".to_string()),
            session_id: Some("cs_unrelated".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(h.ads.deletes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_sweep_removes_expired_hidden_listings_only() {
    let h = harness(catalog());
    let outcome = h
        .service
        .publish(
            h.users_id,
            submission(false, false),
            vec![png_upload("front.png")],
            None,
        )
        .await
        .unwrap();
    let promoted = h
        .service
        .publish(h.users_id, submission(true, false), Vec::new(), None)
        .await
        .unwrap();

    // Backdate both past the retention horizon.
    {
        let mut rows = h.ads.rows.lock().unwrap();
        for row in rows.values_mut() {
            row.expires_at = Utc::now() - Duration::days(1);
        }
    }

    let sweeper = ExpirySweeper::new(h.ads.clone(), h.images.clone(), 3600);
    let removed = sweeper.sweep().await.unwrap();

    assert_eq!(removed, 1);
    assert!(h.ads.listing(outcome.ad_id).is_none());
    assert!(h.ads.listing(promoted.ad_id).is_some());
    assert_eq!(h.images.deleted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_sweeper_task_stops_when_handle_aborted() {
    let h = harness(catalog());
    let sweeper = Arc::new(ExpirySweeper::new(h.ads.clone(), h.images.clone(), 3600));

    let handle = sweeper.start();
    handle.abort();

    let err = handle.await.unwrap_err();
    assert!(err.is_cancelled());
}
