/// Result of validating an uploaded photo's name and type.
#[derive(Debug, PartialEq, Eq)]
pub enum FilenameError {
    /// Filename is empty or whitespace-only.
    Empty,
    /// Filename contains path separators (`/` or `\`).
    ContainsPathSeparator,
    /// Filename contains path traversal patterns (`..`).
    PathTraversal,
    /// Filename contains null bytes.
    NullByte,
    /// Filename starts with a dot (hidden file).
    Hidden,
    /// Filename contains control characters (CR, LF, etc.).
    ControlCharacter,
    /// Content type is not `image/*`.
    NotAnImage,
    /// No usable file extension for the content type.
    UnknownExtension,
}

impl FilenameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Filename cannot be empty",
            Self::ContainsPathSeparator => "Invalid filename: path separators are not allowed",
            Self::PathTraversal => "Invalid filename: '..' is not allowed",
            Self::NullByte => "Invalid filename: null bytes are not allowed",
            Self::Hidden => "Invalid filename: hidden files (starting with '.') are not allowed",
            Self::ControlCharacter => "Invalid filename: control characters are not allowed",
            Self::NotAnImage => "Only image uploads are accepted",
            Self::UnknownExtension => "Could not determine an image file extension",
        }
    }
}

/// Validates a flat filename (no directory components allowed).
pub fn validate_flat_filename(filename: &str) -> Result<&str, FilenameError> {
    let trimmed = filename.trim();

    if trimmed.is_empty() {
        return Err(FilenameError::Empty);
    }

    if trimmed.contains('\0') {
        return Err(FilenameError::NullByte);
    }

    if trimmed.chars().any(|c| c.is_ascii_control()) {
        return Err(FilenameError::ControlCharacter);
    }

    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(FilenameError::ContainsPathSeparator);
    }

    if trimmed == ".." {
        return Err(FilenameError::PathTraversal);
    }

    if trimmed.starts_with('.') {
        return Err(FilenameError::Hidden);
    }

    Ok(trimmed)
}

/// Resolve the lowercase extension an uploaded image is stored under.
///
/// The declared content type wins unless it is missing or generic, in which
/// case the type is guessed from the original filename. Either way the result
/// must be an `image/*` type.
pub fn image_extension(
    file_name: Option<&str>,
    content_type: Option<&str>,
) -> Result<String, FilenameError> {
    let file_name = file_name.map(validate_flat_filename).transpose()?;
    let name_ext = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    let declared = content_type
        .and_then(|ct| ct.parse::<mime_guess::Mime>().ok())
        .filter(|m| m.essence_str() != "application/octet-stream");

    let mime = match declared {
        Some(m) => m,
        None => name_ext
            .as_deref()
            .and_then(|ext| mime_guess::from_ext(ext).first())
            .ok_or(FilenameError::NotAnImage)?,
    };

    if mime.type_() != mime_guess::mime::IMAGE {
        return Err(FilenameError::NotAnImage);
    }

    // Keep the uploader's extension when it agrees with the type.
    if let Some(ext) = name_ext
        && mime_guess::from_ext(&ext)
            .iter()
            .any(|m| m.essence_str() == mime.essence_str())
    {
        return Ok(ext);
    }

    if mime.essence_str() == "image/jpeg" {
        return Ok("jpg".into());
    }

    mime_guess::get_mime_extensions(&mime)
        .and_then(|exts| exts.first())
        .map(|ext| ext.to_string())
        .ok_or(FilenameError::UnknownExtension)
}

/// Map an identifier onto the storage path alphabet (`a-zA-Z0-9`, `-`, `_`, `.`).
///
/// Other characters become `_`; leading dots collapse into a single `_`.
pub fn storage_segment(id: &str) -> String {
    let mut out: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.starts_with('.') {
        out.replace_range(..out.find(|c| c != '.').unwrap_or(out.len()), "");
        out.insert(0, '_');
    }
    out
}

/// Stored object name: `<unix_millis>.<ext>`.
pub fn photo_file_name(unix_millis: i64, ext: &str) -> String {
    format!("{unix_millis}.{ext}")
}
