//! Extraction prompt for bill photos.
//!
//! The prompt is sent verbatim next to the image. It pins the output to a
//! single JSON object so the response can be parsed strictly.

/// JSON keys the model is asked to return.
pub const EXTRACTION_KEYS: [&str; 3] = ["vendorName", "billAmount", "billDate"];

/// Fixed instruction sent with every bill image.
pub const EXTRACTION_PROMPT: &str = "From the attached bill image, extract the vendor name \
(as vendorName), total amount (as a number, billAmount), and bill date (in YYYY-MM-DD format, \
billDate). Respond with only a single, clean JSON object with exactly the keys vendorName, \
billAmount and billDate, and no other text. If a value cannot be found, use null.";

/// MIME type declared for the inline image part.
pub const IMAGE_MIME_TYPE: &str = "image/jpeg";
