//! SQLite schema definition.

/// Schema for the embedded store. Mirrors the hosted `doctors` and `bills` tables.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Doctors
-- ============================================================================

CREATE TABLE IF NOT EXISTS doctors (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Bills
-- ============================================================================

CREATE TABLE IF NOT EXISTS bills (
    id TEXT PRIMARY KEY,
    vendor_name TEXT NOT NULL CHECK (length(vendor_name) > 0),
    bill_no TEXT,
    bill_date TEXT NOT NULL,                     -- YYYY-MM-DD
    bill_amount REAL NOT NULL DEFAULT 0 CHECK (bill_amount >= 0),
    doctor_name TEXT,                            -- free text, not a foreign key
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_bills_date ON bills(bill_date);
"#;
