//! Upload schemas: verification images and mother media files.

#[cfg(test)]
#[path = "files_test.rs"]
mod files_test;

use super::{REQUIRED, Validate, Violations};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const ACCEPTED_IMAGE_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];
pub const ACCEPTED_MEDIA_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", "application/pdf"];

pub const MAX_IMAGE_SIZE: &str = "Max image size is 5MB.";
pub const ALLOWED_IMAGE_FORMATS: &str = "Only .jpg, .jpeg and .png formats are supported.";
pub const ALLOWED_MEDIA_FORMATS: &str = "Only PNG, JPEG and PDF files are supported.";

/// A file picked for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// MIME type is inferred from the file extension.
    #[must_use]
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        Self { name: name.to_owned(), mime: mime_from_name(name).to_owned(), bytes }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

fn mime_from_name(name: &str) -> &'static str {
    let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// An image input that may already hold a stored image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ImageField {
    #[default]
    Missing,
    /// URL of an image the backend already has.
    Existing(String),
    New(UploadFile),
}

impl ImageField {
    /// The freshly picked file, if any.
    #[must_use]
    pub fn new_file(&self) -> Option<&UploadFile> {
        match self {
            Self::New(file) => Some(file),
            Self::Missing | Self::Existing(_) => None,
        }
    }

    fn check(&self, field: &str, violations: &mut Violations) {
        match self {
            Self::Missing => violations.push(field, REQUIRED),
            Self::Existing(_) => {}
            Self::New(file) => {
                if file.size() > MAX_IMAGE_BYTES {
                    violations.push(field, MAX_IMAGE_SIZE);
                }
                if !ACCEPTED_IMAGE_TYPES.contains(&file.mime.as_str()) {
                    violations.push(field, ALLOWED_IMAGE_FORMATS);
                }
            }
        }
    }
}

/// Doctor verification request: professional ID and a government ID.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerificationUpload {
    pub doctor_id_img: ImageField,
    pub valid_id_img: ImageField,
}

impl VerificationUpload {
    /// Multipart field names paired with their inputs.
    #[must_use]
    pub fn fields(&self) -> [(&'static str, &ImageField); 2] {
        [("doctor_id_img", &self.doctor_id_img), ("valid_id_img", &self.valid_id_img)]
    }
}

impl Validate for VerificationUpload {
    fn violations(&self) -> Violations {
        let mut violations = Violations::new();
        for (field, image) in self.fields() {
            image.check(field, &mut violations);
        }
        violations
    }
}

/// Documents a mother shares with her doctor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaUpload {
    pub files: Vec<UploadFile>,
}

impl Validate for MediaUpload {
    fn violations(&self) -> Violations {
        let mut violations = Violations::new();
        if self.files.is_empty() {
            violations.push("files", REQUIRED);
        }
        for (index, file) in self.files.iter().enumerate() {
            if !ACCEPTED_MEDIA_TYPES.contains(&file.mime.as_str()) {
                violations.push(&format!("files.{index}"), ALLOWED_MEDIA_FORMATS);
            }
        }
        violations
    }
}
