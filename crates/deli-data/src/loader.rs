//! Reads catalog, tuning and stock files from a data directory.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers, plus [`load_shift_data`] which resolves the
//! files into engine types.

use deli_core::catalog::{Catalog, CatalogBuilder, CatalogError};
use deli_core::config::ShiftConfig;
use deli_core::persistence::SaveDocument;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::schema::{currency_to_cents, CatalogData, StockData, TuningData};

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// No `{file}.ron`, `{file}.toml` or `{file}.json` in the directory.
    #[error("no '{file}' data file in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("{file}: expected a .ron, .toml or .json extension")]
    UnsupportedFormat { file: PathBuf },

    /// The same base name exists in two formats.
    #[error("both {a} and {b} exist; keep one")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("cannot parse {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A stock entry names an ingredient the catalog lacks.
    #[error("unknown ingredient '{name}' in {file}")]
    UnresolvedRef { file: PathBuf, name: String },

    /// The catalog file does not describe a usable catalog.
    #[error("invalid catalog in {file}: {source}")]
    Catalog {
        file: PathBuf,
        #[source]
        source: CatalogError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

const EXTENSIONS: [(&str, Format); 3] = [("ron", Format::Ron), ("toml", Format::Toml), ("json", Format::Json)];

/// Format by file extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    EXTENSIONS
        .iter()
        .find(|(name, _)| Some(*name) == ext)
        .map(|&(_, format)| format)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

// ===========================================================================
// File discovery
// ===========================================================================

/// The one file in `dir` named `base_name` with a supported extension.
/// `None` when there is none; two formats of the same name conflict.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut present = EXTENSIONS
        .iter()
        .map(|(ext, _)| dir.join(format!("{base_name}.{ext}")))
        .filter(|path| path.is_file());

    match (present.next(), present.next()) {
        (Some(a), Some(b)) => Err(DataLoadError::ConflictingFormats { a, b }),
        (found, _) => Ok(found),
    }
}

/// [`find_data_file`] for files the directory must have.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let text = std::fs::read_to_string(path)?;
    let parsed = match format {
        Format::Ron => ron::from_str(&text).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(&text).map_err(|e| e.to_string()),
        Format::Toml => toml::from_str(&text).map_err(|e| e.to_string()),
    };
    parsed.map_err(|detail| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    })
}

// ===========================================================================
// Resolution
// ===========================================================================

/// Everything a shift needs from the data directory.
#[derive(Debug, Clone)]
pub struct ShiftData {
    pub catalog: Catalog,
    pub config: ShiftConfig,
    /// Stock for a brand new save.
    pub stock: BTreeMap<String, u32>,
}

impl ShiftData {
    /// The save document used when the store has nothing yet.
    pub fn fresh_save(&self) -> SaveDocument {
        SaveDocument::with_stock(self.stock.clone())
    }
}

/// Build a catalog from its data form.
pub fn build_catalog(data: &CatalogData, file: &Path) -> Result<Catalog, DataLoadError> {
    let mut builder = CatalogBuilder::new();
    for ingredient in &data.ingredients {
        builder.register_ingredient(&ingredient.name, ingredient.category, currency_to_cents(ingredient.price));
    }
    for treatment in &data.treatments {
        builder.register_treatment(&treatment.name);
    }
    builder.build().map_err(|source| DataLoadError::Catalog {
        file: file.to_path_buf(),
        source,
    })
}

/// Check every stock entry against the catalog.
pub fn validate_stock(stock: &StockData, catalog: &Catalog, file: &Path) -> Result<(), DataLoadError> {
    match stock.keys().find(|name| catalog.ingredient_id(name).is_none()) {
        Some(name) => Err(DataLoadError::UnresolvedRef {
            file: file.to_path_buf(),
            name: name.clone(),
        }),
        None => Ok(()),
    }
}

/// Load `catalog` (required), `tuning` and `stock` (both optional) from
/// `dir`.
pub fn load_shift_data(dir: &Path) -> Result<ShiftData, DataLoadError> {
    let catalog_path = require_data_file(dir, "catalog")?;
    let catalog_data: CatalogData = deserialize_file(&catalog_path)?;
    let catalog = build_catalog(&catalog_data, &catalog_path)?;

    let config = match find_data_file(dir, "tuning")? {
        Some(path) => deserialize_file::<TuningData>(&path)?.apply(ShiftConfig::default()),
        None => ShiftConfig::default(),
    };

    let stock = match find_data_file(dir, "stock")? {
        Some(path) => {
            let stock: StockData = deserialize_file(&path)?;
            validate_stock(&stock, &catalog, &path)?;
            stock
        }
        None => BTreeMap::new(),
    };

    Ok(ShiftData {
        catalog,
        config,
        stock,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use deli_core::catalog::Category;
    use std::fs;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("deli_data_test_{suffix}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    const CATALOG_RON: &str = r#"(
    ingredients: [
        (name: "bread_white", category: bread, price: 0.5),
        (name: "meat_ham", category: meat, price: 1.5),
        (name: "cheese_swiss", category: cheese, price: 0.75),
    ],
    treatments: [(name: "toast")],
)"#;

    // -----------------------------------------------------------------------
    // detect_format / find_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("catalog.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("catalog.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("catalog.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_format_unsupported() {
        assert!(matches!(
            detect_format(Path::new("catalog.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("catalog")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn find_data_file_missing() {
        let dir = make_test_dir("find_missing");
        assert_eq!(find_data_file(&dir, "tuning").unwrap(), None);
        cleanup(&dir);
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("tuning.ron"), "()").unwrap();
        fs::write(dir.join("tuning.toml"), "").unwrap();
        assert!(matches!(
            find_data_file(&dir, "tuning"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn require_data_file_missing() {
        let dir = make_test_dir("require_missing");
        assert!(matches!(
            require_data_file(&dir, "catalog"),
            Err(DataLoadError::MissingRequired { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn deserialize_file_parse_error() {
        let dir = make_test_dir("parse_err");
        let path = dir.join("catalog.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();
        let result: Result<CatalogData, _> = deserialize_file(&path);
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // load_shift_data
    // -----------------------------------------------------------------------

    #[test]
    fn load_catalog_only_uses_defaults() {
        let dir = make_test_dir("catalog_only");
        fs::write(dir.join("catalog.ron"), CATALOG_RON).unwrap();

        let data = load_shift_data(&dir).unwrap();
        assert_eq!(data.catalog.ingredient_count(), 3);
        assert_eq!(data.catalog.treatment_count(), 1);
        let ham = data.catalog.ingredient_id("meat_ham").unwrap();
        assert_eq!(data.catalog.price(ham), 150);
        assert_eq!(data.catalog.category(ham), Some(Category::Meat));
        assert_eq!(data.config, ShiftConfig::default());
        assert!(data.stock.is_empty());
        cleanup(&dir);
    }

    #[test]
    fn load_full_directory() {
        let dir = make_test_dir("full");
        fs::write(dir.join("catalog.ron"), CATALOG_RON).unwrap();
        fs::write(dir.join("tuning.toml"), "max_active_orders = 2\n[patience]\nbase = 45.0\n").unwrap();
        fs::write(dir.join("stock.json"), r#"{"bread_white": 10, "meat_ham": 4}"#).unwrap();

        let data = load_shift_data(&dir).unwrap();
        assert_eq!(data.config.max_active_orders, 2);
        assert_eq!(data.config.patience.base, deli_core::Fixed64::from_num(45));
        assert_eq!(data.stock.get("bread_white"), Some(&10));
        assert_eq!(data.fresh_save().inventory, data.stock);
        cleanup(&dir);
    }

    #[test]
    fn stock_with_unknown_name_is_rejected() {
        let dir = make_test_dir("bad_stock");
        fs::write(dir.join("catalog.ron"), CATALOG_RON).unwrap();
        fs::write(dir.join("stock.json"), r#"{"bread_rye": 3}"#).unwrap();

        let err = load_shift_data(&dir).unwrap_err();
        assert!(matches!(err, DataLoadError::UnresolvedRef { ref name, .. } if name == "bread_rye"));
        cleanup(&dir);
    }

    #[test]
    fn catalog_without_meat_is_rejected() {
        let dir = make_test_dir("no_meat");
        fs::write(
            dir.join("catalog.json"),
            r#"{"ingredients": [{"name": "bread_white", "category": "bread", "price": 0.5}]}"#,
        )
        .unwrap();

        let err = load_shift_data(&dir).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::Catalog {
                source: CatalogError::MissingCategory(Category::Meat),
                ..
            }
        ));
        cleanup(&dir);
    }

    #[test]
    fn duplicate_catalog_names_are_rejected() {
        let dir = make_test_dir("dup");
        fs::write(
            dir.join("catalog.toml"),
            r#"
[[ingredients]]
name = "bread_white"
category = "bread"
price = 0.5

[[ingredients]]
name = "bread_white"
category = "bread"
price = 0.6

[[ingredients]]
name = "meat_ham"
category = "meat"
price = 1.5
"#,
        )
        .unwrap();

        let err = load_shift_data(&dir).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::Catalog {
                source: CatalogError::DuplicateName(_),
                ..
            }
        ));
        cleanup(&dir);
    }
}
