//! Font resolution for text elements

use crate::schema::FontSpec;
use crate::{Result, TemplateError};
use pdf_core::{FontData, PdfFont, StandardFont};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, warn};

/// How strictly fonts and glyphs are enforced during a fill
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderingCapabilities {
    /// Substitute unknown fonts and unencodable glyphs instead of failing
    pub ignore_missing_fonts: bool,
    /// Do not consult system font directories
    pub headless: bool,
}

impl RenderingCapabilities {
    /// Capabilities after a font-related failure
    pub fn degraded() -> Self {
        Self {
            ignore_missing_fonts: true,
            headless: true,
        }
    }
}

#[derive(Debug, Clone)]
struct FontFile {
    path: PathBuf,
    /// Normalised file stem
    key: String,
}

/// Resolves font names to standard or TrueType fonts
///
/// TrueType fonts are found by file name in the configured font directories
/// and, unless rendering headless, in the system font directories. Files are
/// indexed on first use and parsed once.
#[derive(Debug)]
pub struct FontCatalog {
    default_font: String,
    font_dirs: Vec<PathBuf>,
    system_font_dirs: Vec<PathBuf>,
    configured_index: OnceLock<Vec<FontFile>>,
    system_index: OnceLock<Vec<FontFile>>,
    loaded: Mutex<HashMap<PathBuf, Arc<FontData>>>,
}

impl Default for FontCatalog {
    fn default() -> Self {
        Self::new("Helvetica")
    }
}

impl FontCatalog {
    /// Create a catalog with only the standard fonts
    pub fn new(default_font: impl Into<String>) -> Self {
        Self {
            default_font: default_font.into(),
            font_dirs: Vec::new(),
            system_font_dirs: Vec::new(),
            configured_index: OnceLock::new(),
            system_index: OnceLock::new(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Directories searched for TrueType fonts in every mode
    pub fn with_font_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.font_dirs = dirs;
        self
    }

    /// Directories searched only when not headless
    pub fn with_system_font_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.system_font_dirs = dirs;
        self
    }

    pub fn default_font(&self) -> &str {
        &self.default_font
    }

    /// Platform font directories
    pub fn default_system_font_dirs() -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = if cfg!(target_os = "macos") {
            vec!["/System/Library/Fonts".into(), "/Library/Fonts".into()]
        } else if cfg!(target_os = "windows") {
            vec!["C:\\Windows\\Fonts".into()]
        } else {
            vec!["/usr/share/fonts".into(), "/usr/local/share/fonts".into()]
        };
        if let Some(home) = std::env::var_os("HOME") {
            dirs.push(Path::new(&home).join(".fonts"));
        }
        dirs
    }

    /// Resolve the font of a text element
    ///
    /// An unknown font fails with [`TemplateError::FontError`] unless
    /// `ignore_missing_fonts` is set, in which case the default font is used.
    pub fn resolve(&self, spec: &FontSpec, caps: RenderingCapabilities) -> Result<PdfFont> {
        let name = spec.name.as_deref().unwrap_or(&self.default_font);

        if let Some(font) = self.lookup(name, spec.bold, spec.italic, caps)? {
            return Ok(font);
        }

        if !caps.ignore_missing_fonts {
            return Err(TemplateError::FontError(format!(
                "font '{name}' is not available"
            )));
        }

        debug!(font = name, "Font not available, using default font");
        Ok(self
            .lookup(&self.default_font, spec.bold, spec.italic, caps)?
            .unwrap_or_else(|| standard_fallback(spec.bold, spec.italic)))
    }

    /// Make sure `font` can show every character of `text`
    ///
    /// Missing glyphs fail with [`TemplateError::FontError`] unless
    /// `ignore_missing_fonts` is set; then a known TrueType font covering the
    /// text is substituted, or the font is kept and the characters are
    /// replaced when written.
    pub fn cover_text(
        &self,
        font: PdfFont,
        text: &str,
        caps: RenderingCapabilities,
    ) -> Result<PdfFont> {
        let missing = font.missing_glyphs(text);
        if missing.is_empty() {
            return Ok(font);
        }

        if !caps.ignore_missing_fonts {
            let chars: String = missing.iter().collect();
            return Err(TemplateError::FontError(format!(
                "font '{}' has no glyph for \"{chars}\"",
                font.name()
            )));
        }

        for file in self.candidates(caps) {
            match self.load(file) {
                Ok(data) if missing.iter().all(|c| data.has_glyph(*c)) => {
                    debug!(font = %data.name, "Substituting font for missing glyphs");
                    return Ok(PdfFont::TrueType(data));
                }
                Ok(_) => {}
                Err(e) => debug!(path = %file.path.display(), error = %e, "Skipping font"),
            }
        }

        warn!(
            font = font.name(),
            missing = missing.len(),
            "No font covers the text, replacing missing glyphs"
        );
        Ok(font)
    }

    fn lookup(
        &self,
        name: &str,
        bold: bool,
        italic: bool,
        caps: RenderingCapabilities,
    ) -> Result<Option<PdfFont>> {
        if let Some(standard) = StandardFont::from_family(name, bold, italic) {
            return Ok(Some(PdfFont::Standard(standard)));
        }

        let keys = style_keys(name, bold, italic);
        let regular = style_keys(name, false, false);

        for wanted in [&keys, &regular] {
            let found = self
                .candidates(caps)
                .find(|file| wanted.iter().any(|key| *key == file.key));
            if let Some(file) = found {
                return self.load(file).map(|data| Some(PdfFont::TrueType(data)));
            }
        }

        Ok(None)
    }

    fn candidates(&self, caps: RenderingCapabilities) -> impl Iterator<Item = &FontFile> {
        let configured = self
            .configured_index
            .get_or_init(|| index_font_dirs(&self.font_dirs));
        let system: &[FontFile] = if caps.headless {
            &[]
        } else {
            self.system_index
                .get_or_init(|| index_font_dirs(&self.system_font_dirs))
        };
        configured.iter().chain(system.iter())
    }

    fn load(&self, file: &FontFile) -> Result<Arc<FontData>> {
        let mut loaded = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(data) = loaded.get(&file.path) {
            return Ok(Arc::clone(data));
        }

        let bytes = std::fs::read(&file.path).map_err(|e| {
            TemplateError::FontError(format!("failed to read {}: {e}", file.path.display()))
        })?;
        let name = file
            .path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| file.key.clone());
        let data = Arc::new(
            FontData::from_ttf(&name, bytes)
                .map_err(|e| TemplateError::FontError(e.to_string()))?,
        );

        debug!(font = %name, glyphs = data.mapped_chars(), "Loaded font");
        loaded.insert(file.path.clone(), Arc::clone(&data));
        Ok(data)
    }
}

fn standard_fallback(bold: bool, italic: bool) -> PdfFont {
    PdfFont::Standard(
        StandardFont::from_family("Helvetica", bold, italic).unwrap_or(StandardFont::Helvetica),
    )
}

/// Lowercase alphanumerics only: "DejaVu Sans" and "DejaVuSans" match
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// File stems that may hold the requested face
fn style_keys(name: &str, bold: bool, italic: bool) -> Vec<String> {
    let base = normalize(name);
    let suffixes: &[&str] = match (bold, italic) {
        (true, true) => &["bolditalic", "boldoblique"],
        (true, false) => &["bold"],
        (false, true) => &["italic", "oblique"],
        (false, false) => &["", "regular", "book", "roman"],
    };
    suffixes.iter().map(|suffix| format!("{base}{suffix}")).collect()
}

fn index_font_dirs(dirs: &[PathBuf]) -> Vec<FontFile> {
    let mut files = Vec::new();
    for dir in dirs {
        collect_font_files(dir, &mut files, 0);
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(dirs = dirs.len(), fonts = files.len(), "Indexed font directories");
    files
}

fn collect_font_files(dir: &Path, files: &mut Vec<FontFile>, depth: usize) {
    // Font trees are shallow; the limit guards against symlink loops
    if depth > 8 {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_font_files(&path, files, depth + 1);
            continue;
        }
        let is_ttf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ttf"));
        if let (true, Some(stem)) = (is_ttf, path.file_stem()) {
            let key = normalize(&stem.to_string_lossy());
            files.push(FontFile { path, key });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spec(name: &str) -> FontSpec {
        FontSpec {
            name: Some(name.to_string()),
            ..FontSpec::default()
        }
    }

    #[test]
    fn test_resolve_standard_aliases() {
        let catalog = FontCatalog::default();
        let caps = RenderingCapabilities::default();

        let font = catalog.resolve(&spec("SansSerif"), caps).unwrap();
        assert_eq!(font.name(), "Helvetica");

        let bold = FontSpec {
            bold: true,
            ..spec("Serif")
        };
        assert_eq!(catalog.resolve(&bold, caps).unwrap().name(), "Times-Bold");
    }

    #[test]
    fn test_resolve_default_font() {
        let catalog = FontCatalog::new("Courier");
        let font = catalog
            .resolve(&FontSpec::default(), RenderingCapabilities::default())
            .unwrap();
        assert_eq!(font.name(), "Courier");
    }

    #[test]
    fn test_unknown_font_fails_unless_ignored() {
        let catalog = FontCatalog::default();
        let err = catalog
            .resolve(&spec("No Such Font"), RenderingCapabilities::default())
            .unwrap_err();
        assert!(matches!(err, TemplateError::FontError(_)));
        assert!(err.to_string().contains("No Such Font"));

        let font = catalog
            .resolve(&spec("No Such Font"), RenderingCapabilities::degraded())
            .unwrap();
        assert_eq!(font.name(), "Helvetica");
    }

    #[test]
    fn test_missing_glyphs() {
        let catalog = FontCatalog::default();
        let helvetica = PdfFont::Standard(StandardFont::Helvetica);

        let ok = catalog.cover_text(helvetica.clone(), "Total", RenderingCapabilities::default());
        assert!(ok.is_ok());

        let err = catalog
            .cover_text(helvetica.clone(), "ස", RenderingCapabilities::default())
            .unwrap_err();
        assert!(err.to_string().contains("no glyph"));

        let kept = catalog
            .cover_text(helvetica, "ස", RenderingCapabilities::degraded())
            .unwrap();
        assert_eq!(kept.name(), "Helvetica");
    }

    #[test]
    fn test_font_dir_index() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().to_path_buf();
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("nested").join("Acme-Bold.TTF"), b"not a font").unwrap();
        std::fs::write(dir.join("readme.txt"), b"").unwrap();

        let files = index_font_dirs(&[dir.clone()]);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].key, "acmebold");

        // The file is found by name but cannot be parsed
        let catalog = FontCatalog::default().with_font_dirs(vec![dir]);
        let bold = FontSpec {
            bold: true,
            ..spec("Acme")
        };
        let err = catalog
            .resolve(&bold, RenderingCapabilities::default())
            .unwrap_err();
        assert!(matches!(err, TemplateError::FontError(_)));
    }

    #[test]
    fn test_style_keys() {
        assert_eq!(style_keys("DejaVu Sans", true, false), vec!["dejavusansbold"]);
        assert_eq!(
            style_keys("Arial Unicode", false, false),
            vec!["arialunicode", "arialunicoderegular", "arialunicodebook", "arialunicoderoman"]
        );
    }
}
