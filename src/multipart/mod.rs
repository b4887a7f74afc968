//! Multipart/form-data body encoding.
//!
//! Parts are written straight into a byte buffer as they are appended:
//!
//! ```text
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="model"\r\n
//! \r\n
//! whisper-1\r\n
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="file"; filename="audio.mp3"\r\n
//! Content-Type: audio/mpeg\r\n
//! \r\n
//! <raw bytes>\r\n
//! --{boundary}--\r\n
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::OpenAIError;

/// A text field, optionally carrying a file disposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// Field name
    pub name: String,
    /// Field value
    pub value: String,
    /// Optional filename for file-disposition fields
    pub filename: Option<String>,
    /// Optional MIME type
    pub mime_type: Option<String>,
}

impl FormField {
    /// Creates a plain text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            filename: None,
            mime_type: None,
        }
    }
}

/// A binary part. The bytes are copied into the body when appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryPart {
    /// Field name
    pub field_name: String,
    /// Raw payload
    pub bytes: Bytes,
    /// Filename sent in the disposition header
    pub filename: String,
    /// MIME type sent in the `Content-Type` header
    pub mime_type: String,
}

/// An append-only multipart/form-data body.
#[derive(Debug)]
pub struct MultipartForm {
    boundary: String,
    body: BytesMut,
    parts: usize,
    finalized: bool,
}

impl MultipartForm {
    /// Creates an empty form delimited by `boundary`.
    pub fn new(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: BytesMut::new(),
            parts: 0,
            finalized: false,
        }
    }

    /// The boundary token delimiting this form.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` header value for this form.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Number of parts appended so far.
    pub fn len(&self) -> usize {
        self.parts
    }

    /// Returns true if no part has been appended.
    pub fn is_empty(&self) -> bool {
        self.parts == 0
    }

    /// Appends a text field, with a file disposition when `filename` is set.
    pub fn append_field(
        &mut self,
        name: &str,
        value: &str,
        filename: Option<&str>,
        mime_type: Option<&str>,
    ) -> Result<(), OpenAIError> {
        self.check_open()?;
        check_header_safe("field name", name)?;
        if let Some(filename) = filename {
            check_header_safe("filename", filename)?;
        }
        if let Some(mime_type) = mime_type {
            check_header_safe("MIME type", mime_type)?;
        }

        self.write_headers(name, filename, mime_type);
        self.put(value.as_bytes());
        self.put(b"\r\n");
        self.parts += 1;
        Ok(())
    }

    /// Appends a [`FormField`].
    pub fn append(&mut self, field: &FormField) -> Result<(), OpenAIError> {
        self.append_field(
            &field.name,
            &field.value,
            field.filename.as_deref(),
            field.mime_type.as_deref(),
        )
    }

    /// Appends a binary part with its own `Content-Disposition` and
    /// `Content-Type` header block followed by the raw bytes.
    pub fn append_binary(
        &mut self,
        field_name: &str,
        bytes: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> Result<(), OpenAIError> {
        self.check_open()?;
        check_header_safe("field name", field_name)?;
        check_header_safe("filename", filename)?;
        check_header_safe("MIME type", mime_type)?;

        self.write_headers(field_name, Some(filename), Some(mime_type));
        self.put(bytes);
        self.put(b"\r\n");
        self.parts += 1;
        Ok(())
    }

    /// Appends a [`BinaryPart`].
    pub fn append_part(&mut self, part: &BinaryPart) -> Result<(), OpenAIError> {
        self.append_binary(&part.field_name, &part.bytes, &part.filename, &part.mime_type)
    }

    /// Writes the terminating boundary line. No further appends are accepted.
    pub fn finalize(&mut self) -> Result<(), OpenAIError> {
        self.check_open()?;
        let closing = format!("--{}--\r\n", self.boundary);
        self.put(closing.as_bytes());
        self.finalized = true;
        Ok(())
    }

    /// Consumes the form and returns the encoded body.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if [`finalize`](Self::finalize) was not called.
    pub fn into_body(self) -> Result<Bytes, OpenAIError> {
        if !self.finalized {
            return Err(OpenAIError::Encoding(
                "multipart body taken before finalize".into(),
            ));
        }
        Ok(self.body.freeze())
    }

    fn write_headers(&mut self, name: &str, filename: Option<&str>, mime_type: Option<&str>) {
        let mut head = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"",
            self.boundary, name
        );
        if let Some(filename) = filename {
            head.push_str(&format!("; filename=\"{}\"", filename));
        }
        head.push_str("\r\n");
        if let Some(mime_type) = mime_type {
            head.push_str(&format!("Content-Type: {}\r\n", mime_type));
        }
        head.push_str("\r\n");
        self.put(head.as_bytes());
    }

    fn put(&mut self, bytes: &[u8]) {
        self.body.put_slice(bytes);
    }

    fn check_open(&self) -> Result<(), OpenAIError> {
        if self.finalized {
            return Err(OpenAIError::Encoding(
                "multipart body already finalized".into(),
            ));
        }
        Ok(())
    }
}

/// Header values are written verbatim, so they must not break the header line.
fn check_header_safe(what: &str, value: &str) -> Result<(), OpenAIError> {
    if value.contains(['\r', '\n', '"']) {
        return Err(OpenAIError::Encoding(format!(
            "{} {:?} cannot be written into a part header",
            what, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "Boundary-test";

    fn body_of(form: MultipartForm) -> Vec<u8> {
        form.into_body().unwrap().to_vec()
    }

    #[test]
    fn test_fields_in_append_order() {
        let mut form = MultipartForm::new(BOUNDARY);
        form.append_field("model", "whisper-1", None, None).unwrap();
        form.append_field("prompt", "hello", None, None).unwrap();
        form.finalize().unwrap();
        assert_eq!(form.len(), 2);

        let body = String::from_utf8(body_of(form)).unwrap();
        assert_eq!(
            body,
            "--Boundary-test\r\n\
             Content-Disposition: form-data; name=\"model\"\r\n\r\n\
             whisper-1\r\n\
             --Boundary-test\r\n\
             Content-Disposition: form-data; name=\"prompt\"\r\n\r\n\
             hello\r\n\
             --Boundary-test--\r\n"
        );
        assert_eq!(body.matches("--Boundary-test--").count(), 1);
    }

    #[test]
    fn test_field_with_file_disposition() {
        let mut form = MultipartForm::new(BOUNDARY);
        form.append(&FormField {
            name: "notes".into(),
            value: "abc".into(),
            filename: Some("notes.txt".into()),
            mime_type: Some("text/plain".into()),
        })
        .unwrap();
        form.finalize().unwrap();

        let body = String::from_utf8(body_of(form)).unwrap();
        assert!(body.contains(
            "Content-Disposition: form-data; name=\"notes\"; filename=\"notes.txt\"\r\n\
             Content-Type: text/plain\r\n\r\nabc\r\n"
        ));
    }

    #[test]
    fn test_binary_payload_is_byte_identical() {
        let payload: Vec<u8> = (0..=255u8).chain([b'\r', b'\n', 0, 0xff]).collect();
        let mut form = MultipartForm::new(BOUNDARY);
        form.append_binary("image", &payload, "image.png", "image/png")
            .unwrap();
        form.finalize().unwrap();
        let body = body_of(form);

        let header = b"Content-Type: image/png\r\n\r\n";
        let start = body
            .windows(header.len())
            .position(|w| w == header)
            .unwrap()
            + header.len();
        let marker = format!("\r\n--{}", BOUNDARY);
        let end = start
            + body[start..]
                .windows(marker.len())
                .position(|w| w == marker.as_bytes())
                .unwrap();
        assert_eq!(&body[start..end], payload.as_slice());
    }

    #[test]
    fn test_empty_binary_payload() {
        let mut form = MultipartForm::new(BOUNDARY);
        form.append_part(&BinaryPart {
            field_name: "mask".into(),
            bytes: Bytes::new(),
            filename: "mask.png".into(),
            mime_type: "image/png".into(),
        })
        .unwrap();
        form.finalize().unwrap();

        let body = String::from_utf8(body_of(form)).unwrap();
        assert_eq!(
            body,
            "--Boundary-test\r\n\
             Content-Disposition: form-data; name=\"mask\"; filename=\"mask.png\"\r\n\
             Content-Type: image/png\r\n\r\n\
             \r\n\
             --Boundary-test--\r\n"
        );
    }

    #[test]
    fn test_append_after_finalize_fails() {
        let mut form = MultipartForm::new(BOUNDARY);
        form.finalize().unwrap();
        assert!(matches!(
            form.append_field("n", "1", None, None),
            Err(OpenAIError::Encoding(_))
        ));
        assert!(form.finalize().is_err());
    }

    #[test]
    fn test_body_requires_finalize() {
        let mut form = MultipartForm::new(BOUNDARY);
        form.append_field("n", "1", None, None).unwrap();
        assert!(matches!(form.into_body(), Err(OpenAIError::Encoding(_))));
    }

    #[test]
    fn test_header_injection_rejected() {
        let mut form = MultipartForm::new(BOUNDARY);
        assert!(form
            .append_binary("file", b"x", "a\"b.png", "image/png")
            .is_err());
        assert!(form.append_field("bad\r\nname", "v", None, None).is_err());
        assert!(form.is_empty());
    }

    #[test]
    fn test_content_type() {
        let form = MultipartForm::new(BOUNDARY);
        assert_eq!(form.boundary(), BOUNDARY);
        assert_eq!(
            form.content_type(),
            "multipart/form-data; boundary=Boundary-test"
        );
    }
}
