use url::Url;

/// Turns stored image references into URLs clients can load.
///
/// References are whatever the upload collaborator handed back: either an
/// absolute `http(s)` URL (hosted storage) or a key relative to the media
/// root. Accounts without a profile image get the configured default.
#[derive(Clone, Debug)]
pub struct ImageResolver {
    media_base_url: Url,
    default_profile_image_url: String,
}

impl ImageResolver {
    pub fn new(media_base_url: Url, default_profile_image_url: String) -> Self {
        Self {
            media_base_url,
            default_profile_image_url,
        }
    }

    pub fn resolve(&self, reference: Option<&str>) -> Option<String> {
        let reference = reference.map(str::trim).filter(|r| !r.is_empty())?;

        if let Ok(url) = Url::parse(reference) {
            return match url.scheme() {
                "http" | "https" => Some(url.to_string()),
                scheme => {
                    tracing::warn!(scheme = scheme, "ignoring image reference with unsupported scheme");
                    None
                }
            };
        }

        let key = reference.trim_start_matches('/');
        let key = key.strip_prefix("media/").unwrap_or(key);
        match self.media_base_url.join(key) {
            Ok(url) => Some(url.to_string()),
            Err(err) => {
                tracing::warn!(error = %err, reference = reference, "failed to resolve image reference");
                None
            }
        }
    }

    pub fn profile_image(&self, reference: Option<&str>) -> String {
        self.resolve(reference)
            .unwrap_or_else(|| self.default_profile_image_url.clone())
    }
}
