// Helper for generating UUIDv7 (timestamp-sortable UUIDs)
//
// Refresh token rows are generated app-side with UUIDv7 so that the
// primary key sorts by issue time. User ids stay on BIGSERIAL.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}
