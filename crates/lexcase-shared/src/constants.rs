/// Days between two consecutive hearings of a case
pub const HEARING_CADENCE_DAYS: i64 = 30;

/// Maximum attachment size accepted for relay (25 MiB)
pub const MAX_ATTACHMENT_SIZE: usize = 25 * 1024 * 1024;

/// Root of every relay path: `cases/{account}/{case_id}/{file_name}`
pub const RELAY_PATH_ROOT: &str = "cases";

/// Fallback MIME type for attachments read from disk
pub const DEFAULT_MIME: &str = "application/octet-stream";
