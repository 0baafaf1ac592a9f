//! Fixtures shared by unit and integration tests.

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];
const ALNUM: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn make_from(alphabet: &[u8], len: usize, seed: usize) -> String {
    let mut output = String::with_capacity(len);
    let mut idx = seed % alphabet.len();

    for _ in 0..len {
        output.push(alphabet[idx] as char);
        idx = (idx + 7) % alphabet.len();
    }

    output
}

fn with_signature(signature: &[u8], len: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(len.max(signature.len()));
    bytes.extend_from_slice(signature);
    let mut n: u8 = 0;
    while bytes.len() < len {
        bytes.push(n);
        n = n.wrapping_add(31);
    }
    bytes
}

/// A byte buffer of exactly `len` bytes (or the signature length, if larger)
/// that starts with the PNG signature.
#[must_use]
pub fn png_of_len(len: usize) -> Vec<u8> {
    with_signature(PNG_SIGNATURE, len)
}

/// A JPEG-looking buffer of `len` bytes.
#[must_use]
pub fn jpeg_of_len(len: usize) -> Vec<u8> {
    with_signature(JPEG_SIGNATURE, len)
}

/// A small PNG-signed buffer, useful as a generated image.
#[must_use]
pub fn tiny_png() -> Vec<u8> {
    png_of_len(16)
}

/// Fake `hf_` access token.
#[must_use]
pub fn huggingface_token() -> String {
    format!("hf_{}", make_from(ALNUM, 34, 1))
}

/// Fake `sk-` style key.
#[must_use]
pub fn openai_style_key() -> String {
    format!("sk-{}", make_from(ALNUM, 40, 2))
}

/// Hand-built `multipart/form-data` body for router tests.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBody {
    #[must_use]
    pub fn new() -> Self {
        Self {
            boundary: "tryon-test-boundary-7MA4YWxkTrZu0gW".to_string(),
            body: Vec::new(),
        }
    }

    /// Add a file part. `content_type: None` omits the part's `Content-Type` header.
    #[must_use]
    pub fn file(
        mut self,
        name: &str,
        file_name: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Self {
        self.open_part();
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n")
                .as_bytes(),
        );
        if let Some(ct) = content_type {
            self.body
                .extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        self.body.extend_from_slice(b"\r\n");
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Add a PNG file part.
    #[must_use]
    pub fn png(self, name: &str, data: &[u8]) -> Self {
        let file_name = format!("{name}.png");
        self.file(name, &file_name, Some("image/png"), data)
    }

    /// Add a text part.
    #[must_use]
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.open_part();
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Value for the request's `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Finish the body.
    #[must_use]
    pub fn build(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }

    fn open_part(&mut self) {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
    }
}
