//env
pub const DATABASE_URL_NOT_SET: &str = "DATABASE_URL not set!";

//db
pub const DATABASE_CONNECTION_FAILED: &str = "Failed to connect to database";
pub const DATABASE_ERROR: &str = "Database error";

//mirror
pub const PROPOSAL_NOT_FOUND_ERROR: &str = "Proposal not found";
pub const MEMBER_NOT_FOUND_ERROR: &str = "Member not found";
pub const MIRROR_WRITE_FAILED: &str = "Failed to write mirror record after confirmed transaction";
