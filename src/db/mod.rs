mod schema;
pub mod albums;
pub mod backend;
pub mod labels;
pub mod photos;
pub mod retry;
pub mod sqlite;

use rand::Rng;

pub use albums::{Album, Membership};
pub use backend::Store;
pub use labels::{Label, LabelCandidate, PhotoLabel, BLOCKED};
pub use photos::{diff_columns, Column, Details, Photo, UNKNOWN};
pub use retry::{with_retry, RetryPolicy};
pub use schema::SCHEMA;
pub use sqlite::SqliteDb;

pub const PHOTO_PREFIX: char = 'p';
pub const ALBUM_PREFIX: char = 'a';
pub const LABEL_PREFIX: char = 'l';

const UID_LEN: usize = 16;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a 16 character identifier: the type prefix followed by the
/// current time in base 36 and a random suffix.
pub fn generate_uid(prefix: char) -> String {
    let mut uid = String::with_capacity(UID_LEN);
    uid.push(prefix);

    let mut secs = chrono::Utc::now().timestamp().max(0) as u64;
    let mut time_part = Vec::new();
    while secs > 0 {
        time_part.push(BASE36[(secs % 36) as usize] as char);
        secs /= 36;
    }
    uid.extend(time_part.iter().rev());

    let mut rng = rand::thread_rng();
    while uid.len() < UID_LEN {
        uid.push(BASE36[rng.gen_range(0..BASE36.len())] as char);
    }
    uid
}

/// Whether `s` is a well-formed identifier with the given type prefix.
pub fn is_uid(s: &str, prefix: char) -> bool {
    s.len() == UID_LEN
        && s.starts_with(prefix)
        && s.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Normalize a human-entered title for lookups: lowercase ASCII
/// alphanumerics joined by single hyphens.
pub fn slugify(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
