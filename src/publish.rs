//! Publishing a filtered photo with a caption.
//!
//! The upload is a `multipart/form-data` POST with exactly two parts, in
//! this order:
//!
//! ```text
//! --Boundary-<uuid>\r\n
//! Content-Disposition: form-data; name="description"\r\n
//! \r\n
//! <caption>\r\n
//! --Boundary-<uuid>\r\n
//! Content-Disposition: form-data; name="image"; filename="image.jpg"\r\n
//! Content-Type: image/jpg\r\n
//! \r\n
//! <JPEG bytes>\r\n
//! --Boundary-<uuid>--
//! ```
//!
//! The boundary is fresh per request. The image is re-encoded as JPEG at the
//! configured quality (0.7 by default). Publishing with no image is a no-op.

use crate::imaging::{Quality, encode_jpeg};
use crate::net::{HttpClient, NetworkError};
use image::DynamicImage;
use uuid::Uuid;

pub const DESCRIPTION_FIELD: &str = "description";
pub const IMAGE_FIELD: &str = "image";
pub const IMAGE_FILENAME: &str = "image.jpg";
pub const IMAGE_MIME: &str = "image/jpg";

/// A boundary token unique to one request.
pub fn new_boundary() -> String {
    format!("Boundary-{}", Uuid::new_v4().hyphenated())
}

/// Incremental `multipart/form-data` body writer.
#[derive(Debug, Clone)]
pub struct MultipartBuilder {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    fn open_part(&mut self) {
        self.body.extend_from_slice(b"--");
        self.body.extend_from_slice(self.boundary.as_bytes());
        self.body.extend_from_slice(b"\r\n");
    }

    /// Append a plain form field.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.open_part();
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Append a file field.
    pub fn file(mut self, name: &str, filename: &str, mime: &str, data: &[u8]) -> Self {
        self.open_part();
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Write the terminal marker and return the body.
    pub fn finish(mut self) -> Vec<u8> {
        self.body.extend_from_slice(b"--");
        self.body.extend_from_slice(self.boundary.as_bytes());
        self.body.extend_from_slice(b"--");
        self.body
    }
}

/// A fully encoded upload, ready to send.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub boundary: String,
    pub body: Vec<u8>,
}

impl PublishRequest {
    /// Encode `image` and `description` into a two-part body.
    /// A missing description is sent as an empty field.
    pub fn new(
        image: &DynamicImage,
        description: Option<&str>,
        quality: Quality,
    ) -> Result<Self, NetworkError> {
        let jpeg = encode_jpeg(image, quality)?;
        let builder = MultipartBuilder::new(new_boundary());
        let boundary = builder.boundary().to_string();
        let body = builder
            .text(DESCRIPTION_FIELD, description.unwrap_or_default())
            .file(IMAGE_FIELD, IMAGE_FILENAME, IMAGE_MIME, &jpeg)
            .finish();
        Ok(Self { boundary, body })
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

/// Result of a publish attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// No image was selected; nothing was sent.
    Skipped,
}

/// Upload `image` with its caption to `url`.
///
/// One POST, no retry. The response body is not interpreted beyond the
/// request having succeeded.
pub fn publish(
    client: &impl HttpClient,
    url: &str,
    image: Option<&DynamicImage>,
    description: Option<&str>,
    quality: Quality,
) -> Result<PublishOutcome, NetworkError> {
    let Some(image) = image else {
        log::debug!("publish skipped: no image selected");
        return Ok(PublishOutcome::Skipped);
    };

    let request = PublishRequest::new(image, description, quality)?;
    let content_type = request.content_type();
    match client.post(url, &[("Content-Type", content_type.as_str())], request.body) {
        Ok(_) => {
            log::info!("published to {url}");
            Ok(PublishOutcome::Published)
        }
        Err(e) => {
            log::warn!("publish failed: {e}");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::decode_image;
    use crate::net::tests::MockHttp;

    /// A part as it appears between two boundary lines.
    struct Part {
        headers: String,
        content: Vec<u8>,
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    /// Split a body into parts, asserting the framing along the way.
    fn split_parts(body: &[u8], boundary: &str) -> Vec<Part> {
        let opener = format!("--{boundary}\r\n").into_bytes();
        let terminal = format!("--{boundary}--").into_bytes();
        assert_eq!(count(body, &terminal), 1, "terminal marker must appear once");
        assert!(body.ends_with(&terminal));

        let mut parts = Vec::new();
        let mut rest = &body[..body.len() - terminal.len()];
        while !rest.is_empty() {
            assert!(rest.starts_with(&opener));
            rest = &rest[opener.len()..];
            let end = find(rest, &opener).unwrap_or(rest.len());
            let raw = &rest[..end];
            let split = find(raw, b"\r\n\r\n").unwrap();
            let content = &raw[split + 4..];
            assert!(content.ends_with(b"\r\n"));
            parts.push(Part {
                headers: String::from_utf8(raw[..split].to_vec()).unwrap(),
                content: content[..content.len() - 2].to_vec(),
            });
            rest = &rest[end..];
        }
        parts
    }

    fn test_image() -> DynamicImage {
        DynamicImage::new_rgb8(16, 12)
    }

    #[test]
    fn body_has_description_then_image() {
        let http = MockHttp::new();
        let outcome = publish(
            &http,
            "http://hub/upload/",
            Some(&test_image()),
            Some("a caption"),
            Quality::default(),
        )
        .unwrap();
        assert_eq!(outcome, PublishOutcome::Published);

        let requests = http.get_requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.method, "POST");
        assert_eq!(req.url, "http://hub/upload/");

        let content_type = req.header("Content-Type").unwrap();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();

        let parts = split_parts(&req.body, boundary);
        assert_eq!(parts.len(), 2);

        assert_eq!(
            parts[0].headers,
            "Content-Disposition: form-data; name=\"description\""
        );
        assert_eq!(parts[0].content, b"a caption");

        assert_eq!(
            parts[1].headers,
            "Content-Disposition: form-data; name=\"image\"; filename=\"image.jpg\"\r\n\
             Content-Type: image/jpg"
        );
        let decoded = decode_image(&parts[1].content).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 12));
    }

    #[test]
    fn missing_image_sends_nothing() {
        let http = MockHttp::new();
        let outcome = publish(&http, "http://hub/", None, Some("caption"), Quality::default());
        assert_eq!(outcome.unwrap(), PublishOutcome::Skipped);
        assert!(http.get_requests().is_empty());
    }

    #[test]
    fn missing_description_is_empty_field() {
        let request = PublishRequest::new(&test_image(), None, Quality::default()).unwrap();
        let parts = split_parts(&request.body, &request.boundary);
        assert!(parts[0].content.is_empty());
    }

    #[test]
    fn boundary_is_fresh_per_request() {
        let a = PublishRequest::new(&test_image(), Some("x"), Quality::default()).unwrap();
        let b = PublishRequest::new(&test_image(), Some("x"), Quality::default()).unwrap();
        assert_ne!(a.boundary, b.boundary);
        assert!(a.boundary.starts_with("Boundary-"));
        assert_eq!(
            a.content_type(),
            format!("multipart/form-data; boundary={}", a.boundary)
        );
    }

    #[test]
    fn transport_failure_is_reported_once() {
        let http = MockHttp::replying(vec![None]);
        let result = publish(&http, "http://hub/", Some(&test_image()), Some("x"), Quality::default());
        assert!(result.unwrap_err().is_transport());
        assert_eq!(http.get_requests().len(), 1);
    }

    #[test]
    fn builder_frames_arbitrary_parts() {
        let body = MultipartBuilder::new("XYZ")
            .text("a", "1")
            .file("f", "f.bin", "application/octet-stream", &[0, 1, 2])
            .finish();
        assert_eq!(
            body,
            b"--XYZ\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n\
              --XYZ\r\nContent-Disposition: form-data; name=\"f\"; filename=\"f.bin\"\r\n\
              Content-Type: application/octet-stream\r\n\r\n\x00\x01\x02\r\n--XYZ--"
                .to_vec()
        );
    }

    #[test]
    fn lower_quality_makes_smaller_upload() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(64, 64, |x, y| {
            image::Rgb([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8])
        }));
        let low = PublishRequest::new(&img, None, Quality::new(10)).unwrap();
        let high = PublishRequest::new(&img, None, Quality::new(95)).unwrap();
        assert!(low.body.len() < high.body.len());
    }
}
