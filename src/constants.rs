pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PORT: u16 = 3000;
pub const MONGO_MIN_POOL_SIZE: u32 = 5;
pub const MONGO_MAX_POOL_SIZE: u32 = 10;
pub const MONGO_CONN_TIMEOUT: u64 = 10;
pub const DEFAULT_QUERY_LIMIT: i64 = 1000;

pub const OTP_LENGTH: u32 = 6;
pub const OTP_MAX_LENGTH: u32 = 12;
pub const OTP_VALIDITY_MINS: i64 = 10;
pub const OTP_MAX_ATTEMPTS: u32 = 3;

pub const DIRECTORY_CACHE_TTL_SECS: u64 = 5 * 60;
pub const CACHE_SWEEP_INTERVAL_SECS: u64 = 60;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const FIREBASE_MESSAGE_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
pub const FCM_ENDPOINT_BASE: &str = "https://fcm.googleapis.com/v1/projects";
// refresh the google access token this many seconds before it expires
pub const ACCESS_TOKEN_EXPIRY_MARGIN_SECS: i64 = 15 * 60;
pub const SMS_DEFAULT_COUNTRY_CODE: &str = "91";

pub const DB_NAME: &str = "paymentCollection";

pub const COLL_OTP: &str = "otps";
pub const COLL_USER_DEVICES: &str = "userDevices";
pub const COLL_PAYMENTS: &str = "payments";
pub const COLL_USERS: &str = "users";

pub const OTP_PUSH_TITLE: &str = "Payment Verification OTP";
pub const OTP_MESSAGE_TEMPLATE: &str = "Dear {{retailerName}}, your OTP for the payment of {{amount}} collected by {{lineWorkerName}} is {{code}}. It is valid for {{validityMins}} minutes.";
pub const COMPLETION_PUSH_TITLE: &str = "Payment Completed";
pub const RETAILER_COMPLETION_TEMPLATE: &str = "Your payment of {{amount}} to {{wholesalerName}} has been confirmed. Collected by {{lineWorkerName}}.";
pub const WHOLESALER_COMPLETION_TEMPLATE: &str =
    "{{retailerName}} paid {{amount}} via {{lineWorkerName}}. Payment ID: {{paymentId}}.";

pub const EVENT_OTP: &str = "PAYMENT_OTP";
pub const EVENT_PAYMENT_COMPLETED: &str = "PAYMENT_COMPLETED";
