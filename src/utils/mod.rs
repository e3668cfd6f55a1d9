pub mod file_name;
pub mod fingerprint;

pub use file_name::export_file_name;
pub use fingerprint::{DocumentFingerprint, fingerprint_document};
