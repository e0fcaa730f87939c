/// Returns `true` for 2xx status codes.
///
/// # Examples
///
/// ```
/// use pulith_rest::is_success_status;
///
/// assert!(is_success_status(200));
/// assert!(is_success_status(204));
/// assert!(!is_success_status(304));
/// assert!(!is_success_status(404));
/// ```
pub fn is_success_status(status: u16) -> bool {
    (200..=299).contains(&status)
}
