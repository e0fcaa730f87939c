//! Pure transformations for REST transfers.
//!
//! Status classification and multipart framing. No I/O happens here.

mod multipart;
mod status;

pub use multipart::{
    closing_delimiter, field_part_header, file_part_header, generate_boundary, PART_TERMINATOR,
};
pub use status::is_success_status;
