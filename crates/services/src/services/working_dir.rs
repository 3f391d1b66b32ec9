/// Session id clients send before a session has been created.
const NEW_SESSION: &str = "new";

/// Storage root that a session's tool outputs are resolved against: the caller's explicit
/// directory when given, else the session's folder in the session files bucket.
pub fn effective_working_dir(
    explicit: Option<&str>,
    bucket: Option<&str>,
    shop_id: &str,
    session_id: &str,
) -> Option<String> {
    if let Some(dir) = explicit.filter(|dir| !dir.is_empty()) {
        return Some(dir.to_string());
    }
    let bucket = bucket.filter(|bucket| !bucket.is_empty())?;
    if shop_id.is_empty() || session_id.is_empty() || session_id == NEW_SESSION {
        return None;
    }
    Some(format!("gs://{bucket}/session_files/{shop_id}/{session_id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directory_wins() {
        assert_eq!(
            effective_working_dir(Some("s3://other/dir"), Some("files"), "shop", "s-1").as_deref(),
            Some("s3://other/dir")
        );
    }

    #[test]
    fn derives_the_session_folder() {
        assert_eq!(
            effective_working_dir(None, Some("files"), "shop-1", "s-1").as_deref(),
            Some("gs://files/session_files/shop-1/s-1")
        );
        assert_eq!(
            effective_working_dir(Some(""), Some("files"), "shop-1", "s-1").as_deref(),
            Some("gs://files/session_files/shop-1/s-1")
        );
    }

    #[test]
    fn nothing_to_derive() {
        assert_eq!(effective_working_dir(None, None, "shop-1", "s-1"), None);
        assert_eq!(effective_working_dir(None, Some("files"), "shop-1", "new"), None);
        assert_eq!(effective_working_dir(None, Some("files"), "", "s-1"), None);
    }
}
