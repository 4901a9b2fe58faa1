use crate::error::UploadError;
use crate::models::{MultipartFraming, UploadKind};
use bytes::Bytes;
use uuid::Uuid;

/// Generate a fresh boundary for one upload attempt.
pub fn make_boundary() -> String {
    format!("Boundary-{}", Uuid::new_v4().simple().to_string().to_uppercase())
}

/// Value of the Content-Type header matching a boundary.
pub fn content_type_for(boundary: &str) -> String {
    format!("multipart/form-data; boundary={}", boundary)
}

/// Build the bytes that precede and follow the raw file content of a single
/// `multipart/form-data` part.
///
/// Header values may not contain line breaks; such input, or framing that
/// encodes to nothing, is reported as [`UploadError::FramingEncoding`] and
/// the attempt must be aborted.
pub fn build_framing(
    boundary: &str,
    kind: UploadKind,
    field: &str,
    filename: &str,
) -> Result<MultipartFraming, UploadError> {
    if boundary.is_empty() || [boundary, field, filename].iter().any(|s| breaks_header(s)) {
        return Err(UploadError::FramingEncoding);
    }

    let mut prefix = Vec::new();
    prefix.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    prefix.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    prefix.extend_from_slice(format!("Content-Type: {}\r\n\r\n", kind.mime()).as_bytes());

    let mut suffix = Vec::new();
    suffix.extend_from_slice(b"\r\n");
    suffix.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    if prefix.is_empty() || suffix.is_empty() {
        return Err(UploadError::FramingEncoding);
    }

    Ok(MultipartFraming {
        prefix: Bytes::from(prefix),
        suffix: Bytes::from(suffix),
    })
}

fn breaks_header(value: &str) -> bool {
    value.contains('\r') || value.contains('\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing_literal_bytes() {
        let framing = build_framing("Boundary-TEST", UploadKind::Jpeg, "image", "image.jpg").unwrap();
        assert_eq!(
            &framing.prefix[..],
            &b"--Boundary-TEST\r\nContent-Disposition: form-data; name=\"image\"; filename=\"image.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"[..]
        );
        assert_eq!(&framing.suffix[..], &b"\r\n--Boundary-TEST--\r\n"[..]);
    }

    #[test]
    fn test_prefix_leads_with_boundary_once() {
        for kind in [UploadKind::Jpeg, UploadKind::Png, UploadKind::QuickTime] {
            let boundary = make_boundary();
            let filename = kind.upload_filename("media");
            let framing = build_framing(&boundary, kind, "file", &filename).unwrap();

            assert!(!framing.prefix.is_empty());
            assert!(!framing.suffix.is_empty());

            let prefix = String::from_utf8(framing.prefix.to_vec()).unwrap();
            assert!(prefix.starts_with(&format!("--{}\r\n", boundary)));
            assert_eq!(prefix.matches(boundary.as_str()).count(), 1);
            assert!(prefix.contains(kind.mime()));
        }
    }

    #[test]
    fn test_boundaries_are_unique() {
        let a = make_boundary();
        let b = make_boundary();
        assert!(a.starts_with("Boundary-"));
        assert_eq!(a.len(), "Boundary-".len() + 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_content_type_header() {
        assert_eq!(
            content_type_for("Boundary-TEST"),
            "multipart/form-data; boundary=Boundary-TEST"
        );
    }

    #[test]
    fn test_rejects_header_injection() {
        let res = build_framing("Boundary-TEST", UploadKind::Png, "image\r\nX-Evil: 1", "a.png");
        assert!(matches!(res, Err(UploadError::FramingEncoding)));

        let res = build_framing("", UploadKind::Png, "image", "a.png");
        assert!(matches!(res, Err(UploadError::FramingEncoding)));
    }
}
