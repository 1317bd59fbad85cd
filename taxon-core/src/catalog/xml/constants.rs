pub const TAXONOMY_PREFIX: &str = "mtc";
pub const TAXONOMY_NS: &str =
    "https://cls-schemas.s3.us-west-1.amazonaws.com/MII/MeasurandTaxonomyCatalog";
pub const UOM_PREFIX: &str = "uom";
pub const UOM_NS: &str = "https://cls-schemas.s3.us-west-1.amazonaws.com/MII/UOM_Database";

pub(crate) const CATALOG_ROOT: &str = "Taxonomy";
pub(crate) const ENTRY_ELEMENT: &str = "Taxon";
pub(crate) const NAME_ATTRIBUTE: &str = "name";

pub(crate) const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;
pub(crate) const INDENT_CHAR: u8 = b' ';
pub(crate) const INDENT_SIZE: usize = 2;
