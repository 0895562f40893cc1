/// Application name
pub const APP_NAME: &str = "ResumeSection";

/// Currency of every offering amount (francs CFA)
pub const CURRENCY: &str = "XOF";

/// Wire and storage format of calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Maximum preacher name length in characters
pub const PREACHER_MAX_LEN: usize = 120;

/// Minimum username length after trimming
pub const USERNAME_MIN_LEN: usize = 3;

/// Minimum password length
pub const PASSWORD_MIN_LEN: usize = 6;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 5000;

/// Default lifetime of an access token, in hours
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 8;
