use base64::Engine;
use epub_core::{DropReason, ImageAsset, ImageMime, ImageOutcome, ImageSource};
use epub_logging::{epub_debug, epub_warn};
use futures_util::stream::{self, StreamExt};
use percent_encoding::percent_decode_str;
use url::Url;

use crate::fetch::Fetcher;

/// Fetch every image concurrently, at most `concurrency` at a time.
///
/// Outcomes come back in the order of `sources`. A failure only drops its own
/// image; this never returns an error.
pub async fn resolve_images(
    fetcher: &dyn Fetcher,
    sources: Vec<ImageSource>,
    base_url: Option<&str>,
    concurrency: usize,
) -> Vec<ImageOutcome> {
    let base = base_url.and_then(|url| Url::parse(url).ok());
    let total = sources.len();
    let outcomes: Vec<ImageOutcome> = stream::iter(sources)
        .map(|source| resolve_one(fetcher, source, base.as_ref()))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let resolved = outcomes
        .iter()
        .filter(|o| matches!(o, ImageOutcome::Resolved(_)))
        .count();
    epub_debug!("resolved {resolved} of {total} images");
    outcomes
}

async fn resolve_one(
    fetcher: &dyn Fetcher,
    source: ImageSource,
    base: Option<&Url>,
) -> ImageOutcome {
    let Some(src) = source.src else {
        epub_warn!("dropping image {}: no source", source.index);
        return ImageOutcome::Dropped(DropReason::MissingSource);
    };
    if let Some(inline) = decode_data_url(&src) {
        return match inline {
            Ok((mime_type, bytes)) => accept(source.index, src, &mime_type, bytes),
            Err(message) => {
                epub_warn!("dropping inline image {}: {message}", source.index);
                ImageOutcome::Dropped(DropReason::Fetch(message))
            }
        };
    }
    let url = match absolute_url(&src, base) {
        Ok(url) => url,
        Err(message) => {
            epub_warn!("dropping image {src}: {message}");
            return ImageOutcome::Dropped(DropReason::Fetch(message));
        }
    };

    match fetcher.fetch(&url).await {
        Ok(resource) => accept(source.index, src, &resource.mime_type, resource.bytes),
        Err(err) => {
            epub_warn!("dropping image {url}: {err}");
            ImageOutcome::Dropped(DropReason::Fetch(err.to_string()))
        }
    }
}

fn accept(index: usize, src: String, mime_type: &str, bytes: Vec<u8>) -> ImageOutcome {
    match ImageMime::from_mime(mime_type) {
        Some(mime) => ImageOutcome::Resolved(ImageAsset::new(index, src, mime, bytes)),
        None => {
            epub_warn!("dropping image {index}: unsupported type {mime_type}");
            ImageOutcome::Dropped(DropReason::Unsupported(mime_type.to_string()))
        }
    }
}

/// Decode an inline `data:` image into its media type and bytes.
///
/// Returns `None` when `src` is not a `data:` URI. The media type defaults to
/// `text/plain` as for any data URI without one.
fn decode_data_url(src: &str) -> Option<Result<(String, Vec<u8>), String>> {
    let scheme = src.get(..5)?;
    if !scheme.eq_ignore_ascii_case("data:") {
        return None;
    }
    let Some((header, payload)) = src[5..].split_once(',') else {
        return Some(Err("data url without a payload".to_string()));
    };

    let mut params = header.split(';').map(str::trim);
    let mime_type = match params.next() {
        Some(mime) if !mime.is_empty() => mime.to_ascii_lowercase(),
        _ => "text/plain".to_string(),
    };
    let is_base64 = params.any(|param| param.eq_ignore_ascii_case("base64"));

    let bytes: Vec<u8> = percent_decode_str(payload).collect();
    if !is_base64 {
        return Some(Ok((mime_type, bytes)));
    }
    let compact: Vec<u8> = bytes
        .into_iter()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    Some(
        base64::engine::general_purpose::STANDARD
            .decode(&compact)
            .map(|decoded| (mime_type, decoded))
            .map_err(|err| format!("invalid base64 payload: {err}")),
    )
}

/// Resolve `src` against the article URL; absolute URLs pass through.
pub fn absolute_url(src: &str, base: Option<&Url>) -> Result<String, String> {
    match Url::parse(src) {
        Ok(url) => Ok(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => base
            .ok_or_else(|| format!("relative image reference {src} without a page url"))?
            .join(src)
            .map(|url| url.to_string())
            .map_err(|err| err.to_string()),
        Err(err) => Err(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_urls_decode_locally() {
        let (mime, bytes) = decode_data_url("data:Image/PNG;base64,iVBO Rw==").unwrap().unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"\x89PNG");

        let (mime, bytes) = decode_data_url("data:,a%20b").unwrap().unwrap();
        assert_eq!(mime, "text/plain");
        assert_eq!(bytes, b"a b");

        assert!(decode_data_url("data:image/png;base64,@@@").unwrap().is_err());
        assert!(decode_data_url("data:image/png").unwrap().is_err());
        assert!(decode_data_url("https://x.test/a.png").is_none());
        assert!(decode_data_url("img.png").is_none());
    }

    #[test]
    fn relative_references_join_the_page_url() {
        let base = Url::parse("https://blog.test/posts/2024/entry.html").unwrap();
        assert_eq!(
            absolute_url("../img/a.png", Some(&base)).unwrap(),
            "https://blog.test/posts/img/a.png"
        );
        assert_eq!(
            absolute_url("//cdn.test/b.jpg", Some(&base)).unwrap(),
            "https://cdn.test/b.jpg"
        );
        assert_eq!(
            absolute_url("https://x.test/c.jpg", None).unwrap(),
            "https://x.test/c.jpg"
        );
        assert!(absolute_url("d.jpg", None).is_err());
    }
}
