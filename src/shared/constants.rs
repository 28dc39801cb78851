/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// STORAGE FOLDERS
// =============================================================================

/// Folder hint for blobs that back document records
pub const DOCUMENTS_FOLDER: &str = "documents";

/// Folder hint for standalone images (no metadata row)
pub const IMAGES_FOLDER: &str = "images";
