//! Field metadata.

use crate::naming;
use serde::{Deserialize, Serialize};

/// Semantic field type, as stored in `fieldinfo.fieldtype`.
///
/// Each type maps to exactly one physical column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// `C`
    Char,
    /// `Z`: text assembled from several parts
    CompoundChar,
    /// `D`
    Date,
    /// `T`
    Time,
    /// `F`
    Float,
    /// `B`
    Boolean,
    /// `L`
    Long,
    /// `S`
    Short,
    /// `K`: code into a fixed catalog
    FixedCatalog,
    /// `X`: code into a variable catalog
    VariableCatalog,
    /// `N`: numeric with generic encoding
    GenericNumeric,
    /// `U`: structured value stored as an integer handle
    Structured,
    /// Any other code; stored as text.
    Unknown(char),
}

impl FieldType {
    /// Parse the metadata code. Only the first character is significant.
    pub fn from_code(code: &str) -> Self {
        match code.trim().chars().next() {
            Some('C') => FieldType::Char,
            Some('Z') => FieldType::CompoundChar,
            Some('D') => FieldType::Date,
            Some('T') => FieldType::Time,
            Some('F') => FieldType::Float,
            Some('B') => FieldType::Boolean,
            Some('L') => FieldType::Long,
            Some('S') => FieldType::Short,
            Some('K') => FieldType::FixedCatalog,
            Some('X') => FieldType::VariableCatalog,
            Some('N') => FieldType::GenericNumeric,
            Some('U') => FieldType::Structured,
            Some(other) => FieldType::Unknown(other),
            None => FieldType::Unknown(' '),
        }
    }

    pub fn code(self) -> char {
        match self {
            FieldType::Char => 'C',
            FieldType::CompoundChar => 'Z',
            FieldType::Date => 'D',
            FieldType::Time => 'T',
            FieldType::Float => 'F',
            FieldType::Boolean => 'B',
            FieldType::Long => 'L',
            FieldType::Short => 'S',
            FieldType::FixedCatalog => 'K',
            FieldType::VariableCatalog => 'X',
            FieldType::GenericNumeric => 'N',
            FieldType::Structured => 'U',
            FieldType::Unknown(c) => c,
        }
    }

    /// Physical column type used in `CREATE TABLE` / `ALTER TABLE`.
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldType::Char | FieldType::CompoundChar => "TEXT COLLATE NOCASE",
            FieldType::Date | FieldType::Time => "TEXT",
            FieldType::Float => "REAL",
            FieldType::Boolean
            | FieldType::Long
            | FieldType::Short
            | FieldType::FixedCatalog
            | FieldType::VariableCatalog
            | FieldType::GenericNumeric
            | FieldType::Structured => "INTEGER",
            FieldType::Unknown(_) => "TEXT",
        }
    }

    pub fn is_char(self) -> bool {
        matches!(self, FieldType::Char | FieldType::CompoundChar)
    }

    pub fn is_catalog(self) -> bool {
        matches!(self, FieldType::FixedCatalog | FieldType::VariableCatalog)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Long | FieldType::Short | FieldType::Float | FieldType::GenericNumeric
        )
    }

    pub fn is_boolean(self) -> bool {
        self == FieldType::Boolean
    }
}

/// One field of an info area.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub info_area_id: String,
    pub field_id: i32,
    /// Stable external name used by configuration and name lookups.
    pub xml_name: String,
    /// Display name.
    pub name: String,
    pub field_type: FieldType,
    pub field_len: i32,
    /// Catalog number for catalog fields, 0 otherwise.
    pub cat: i32,
    /// Parent catalog number for dependent catalogs, 0 otherwise.
    pub ucat: i32,
    pub attributes: i32,
    pub rep_mode: String,
    pub rights: i32,
    pub format: String,
    pub array_field_indices: Vec<i32>,
}

impl FieldInfo {
    /// Attribute bit marking a field backed by an auxiliary participants table.
    pub const ATTR_PARTICIPANTS: i32 = 0x0100;

    pub fn new(info_area_id: impl Into<String>, field_id: i32, field_type: FieldType) -> Self {
        Self {
            info_area_id: info_area_id.into(),
            field_id,
            xml_name: String::new(),
            name: String::new(),
            field_type,
            field_len: 0,
            cat: 0,
            ucat: 0,
            attributes: 0,
            rep_mode: String::new(),
            rights: 0,
            format: String::new(),
            array_field_indices: Vec::new(),
        }
    }

    pub fn with_xml_name(mut self, xml_name: impl Into<String>) -> Self {
        self.xml_name = xml_name.into();
        self
    }

    pub fn with_catalog(mut self, cat: i32, ucat: i32) -> Self {
        self.cat = cat;
        self.ucat = ucat;
        self
    }

    pub fn with_attributes(mut self, attributes: i32) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn column_name(&self) -> String {
        naming::field_column(self.field_id)
    }

    pub fn is_participants(&self) -> bool {
        self.attributes & Self::ATTR_PARTICIPANTS != 0
    }

    pub fn is_catalog(&self) -> bool {
        self.field_type.is_catalog() && self.cat > 0
    }

    pub fn is_fixed_catalog(&self) -> bool {
        self.field_type == FieldType::FixedCatalog && self.cat > 0
    }
}

/// Parse `arrayfieldindices` (comma separated). Malformed entries are skipped.
pub fn parse_array_field_indices(text: &str) -> Vec<i32> {
    text.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}
