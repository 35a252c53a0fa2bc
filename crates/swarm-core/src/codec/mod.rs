//! Codecs for the two textual wire formats: task posts and claim/delivery comments.

pub mod delivery;
pub mod task;

pub use self::task::{JOB_TITLE_PREFIX, decode, decode_body, decode_post, encode, extract_envelope, post_title};
