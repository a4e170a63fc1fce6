/// File categorization by extension.
///
/// Maps file extensions to the broad categories used by organize-by-type.
/// Anything the table does not know lands in [`Category::Other`].
///
/// # Examples
///
/// ```
/// use dirshift::file_category::{Category, FileMapper};
///
/// let mapper = FileMapper::default();
/// assert_eq!(mapper.extension_to_category("pdf"), Some(Category::Document));
/// assert_eq!(mapper.categorize(Some("JPG")), Category::Image);
/// assert_eq!(mapper.categorize(Some("xyz")), Category::Other);
/// ```
use std::collections::HashMap;

/// Represents a broad file category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Documents and office files (PDF, DOCX, TXT, XLSX, etc.)
    Document,
    /// Image files (PNG, JPG, GIF, etc.)
    Image,
    /// Video files (MP4, MKV, AVI, etc.)
    Video,
    /// Audio files (MP3, WAV, FLAC, etc.)
    Audio,
    /// Archive files (ZIP, RAR, 7Z, etc.)
    Archive,
    /// Source code and structured text (Rust, Python, JSON, etc.)
    Code,
    /// Unknown or uncategorized files
    Other,
}

impl Category {
    /// Returns the directory name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirshift::file_category::Category;
    ///
    /// assert_eq!(Category::Image.dir_name(), "Images");
    /// assert_eq!(Category::Audio.dir_name(), "Audio");
    /// assert_eq!(Category::Other.dir_name(), "Other");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Document => "Documents",
            Category::Image => "Images",
            Category::Video => "Videos",
            Category::Audio => "Audio",
            Category::Archive => "Archives",
            Category::Code => "Code",
            Category::Other => "Other",
        }
    }
}

/// Maps file extensions to categories.
///
/// Lookups are case-insensitive. Extra mappings can be added on top of the
/// standard table.
#[derive(Debug, Clone)]
pub struct FileMapper {
    extension_map: HashMap<String, Category>,
}

impl FileMapper {
    /// Creates a new `FileMapper` with all standard mappings.
    pub fn new() -> Self {
        let mut mapper = Self {
            extension_map: HashMap::new(),
        };
        mapper.populate_standard_mappings();
        mapper
    }

    fn populate_standard_mappings(&mut self) {
        const TABLE: &[(Category, &[&str])] = &[
            (
                Category::Document,
                &[
                    "pdf", "doc", "docx", "txt", "rtf", "odt", "xls", "xlsx", "ppt", "pptx", "csv",
                ],
            ),
            (
                Category::Image,
                &[
                    "jpg", "jpeg", "png", "gif", "bmp", "svg", "ico", "webp", "tiff", "tif",
                ],
            ),
            (
                Category::Video,
                &[
                    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg",
                ],
            ),
            (
                Category::Audio,
                &["mp3", "wav", "flac", "aac", "ogg", "wma", "m4a", "opus"],
            ),
            (
                Category::Archive,
                &["zip", "rar", "7z", "tar", "gz", "bz2", "xz", "iso"],
            ),
            (
                Category::Code,
                &[
                    "py", "js", "java", "cpp", "c", "h", "cs", "php", "rb", "go", "rs", "ts",
                    "html", "css", "json", "xml", "yaml", "yml", "sh", "bat",
                ],
            ),
        ];

        for (category, extensions) in TABLE {
            for ext in *extensions {
                self.add_extension_mapping(ext, *category);
            }
        }
    }

    /// Adds a file extension to category mapping.
    pub fn add_extension_mapping(&mut self, ext: &str, category: Category) {
        self.extension_map
            .insert(ext.trim_start_matches('.').to_lowercase(), category);
    }

    /// Maps a file extension (with or without the leading dot) to a category.
    pub fn extension_to_category(&self, ext: &str) -> Option<Category> {
        self.extension_map
            .get(&ext.trim_start_matches('.').to_lowercase())
            .copied()
    }

    /// Determines the category for a file given its extension, defaulting to
    /// [`Category::Other`].
    pub fn categorize(&self, ext: Option<&str>) -> Category {
        ext.and_then(|e| self.extension_to_category(e))
            .unwrap_or(Category::Other)
    }
}

impl Default for FileMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_dir_names() {
        assert_eq!(Category::Document.dir_name(), "Documents");
        assert_eq!(Category::Image.dir_name(), "Images");
        assert_eq!(Category::Video.dir_name(), "Videos");
        assert_eq!(Category::Audio.dir_name(), "Audio");
        assert_eq!(Category::Archive.dir_name(), "Archives");
        assert_eq!(Category::Code.dir_name(), "Code");
        assert_eq!(Category::Other.dir_name(), "Other");
    }

    #[test]
    fn test_extension_to_category() {
        let mapper = FileMapper::default();
        assert_eq!(
            mapper.extension_to_category("pdf"),
            Some(Category::Document)
        );
        assert_eq!(mapper.extension_to_category("mp3"), Some(Category::Audio));
        assert_eq!(mapper.extension_to_category("rs"), Some(Category::Code));
        assert_eq!(mapper.extension_to_category(".mkv"), Some(Category::Video));
    }

    #[test]
    fn test_extension_to_category_case_insensitive() {
        let mapper = FileMapper::default();
        assert_eq!(
            mapper.extension_to_category("PDF"),
            Some(Category::Document)
        );
        assert_eq!(mapper.extension_to_category("Mp3"), Some(Category::Audio));
    }

    #[test]
    fn test_categorize_defaults_to_other() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.categorize(None), Category::Other);
        assert_eq!(mapper.categorize(Some("xyz")), Category::Other);
    }

    #[test]
    fn test_every_extension_maps_to_one_category() {
        let mapper = FileMapper::default();
        // "csv" and "xlsx" are office documents, not code
        assert_eq!(mapper.categorize(Some("csv")), Category::Document);
        assert_eq!(mapper.categorize(Some("xlsx")), Category::Document);
        assert_eq!(mapper.categorize(Some("html")), Category::Code);
    }

    #[test]
    fn test_custom_mapping() {
        let mut mapper = FileMapper::default();
        mapper.add_extension_mapping("custom", Category::Code);
        assert_eq!(mapper.extension_to_category("custom"), Some(Category::Code));
    }
}
