//! Link metadata.
//!
//! A link is declared once per direction in `linkinfo`. Which physical
//! encoding it uses (composite key, single field pair, generic pair of
//! columns, foreign-key column, identity) is derived from its flags, and the
//! query compiler picks its join predicate from that.

use crate::naming;

/// `linkinfo.relationtype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkRelation {
    /// Both sides share the record id.
    Ident,
    OneToOne,
    OneToMany,
    ManyToOne,
    /// Target is discriminated by a companion info-area column.
    Generic,
    Unknown,
}

impl LinkRelation {
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "IDENT" | "ID" => LinkRelation::Ident,
            "1:1" | "ONETOONE" => LinkRelation::OneToOne,
            "1:N" | "ONETOMANY" => LinkRelation::OneToMany,
            "N:1" | "MANYTOONE" => LinkRelation::ManyToOne,
            "GENERIC" | "G" => LinkRelation::Generic,
            _ => LinkRelation::Unknown,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            LinkRelation::Ident => "IDENT",
            LinkRelation::OneToOne => "1:1",
            LinkRelation::OneToMany => "1:N",
            LinkRelation::ManyToOne => "N:1",
            LinkRelation::Generic => "GENERIC",
            LinkRelation::Unknown => "",
        }
    }

    /// The same relation seen from the other endpoint.
    pub fn reversed(self) -> Self {
        match self {
            LinkRelation::OneToMany => LinkRelation::ManyToOne,
            LinkRelation::ManyToOne => LinkRelation::OneToMany,
            other => other,
        }
    }

    fn column_side(self) -> LinkColumnSide {
        match self {
            LinkRelation::OneToOne | LinkRelation::ManyToOne | LinkRelation::Generic => {
                LinkColumnSide::Source
            }
            LinkRelation::OneToMany => LinkColumnSide::Target,
            LinkRelation::Ident | LinkRelation::Unknown => LinkColumnSide::None,
        }
    }
}

/// Which table physically stores the link column(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkColumnSide {
    None,
    Source,
    Target,
}

impl LinkColumnSide {
    fn flipped(self) -> Self {
        match self {
            LinkColumnSide::Source => LinkColumnSide::Target,
            LinkColumnSide::Target => LinkColumnSide::Source,
            LinkColumnSide::None => LinkColumnSide::None,
        }
    }
}

/// One pair of a composite-key link (`linkfields` row).
///
/// A non-empty literal replaces the column on its side; a field id below
/// zero with an empty literal means "IS NULL".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFieldInfo {
    pub source_field_id: i32,
    pub dest_field_id: i32,
    pub source_value: String,
    pub dest_value: String,
}

impl LinkFieldInfo {
    pub fn fields(source_field_id: i32, dest_field_id: i32) -> Self {
        Self {
            source_field_id,
            dest_field_id,
            source_value: String::new(),
            dest_value: String::new(),
        }
    }

    pub fn with_source_value(mut self, value: impl Into<String>) -> Self {
        self.source_value = value.into();
        self
    }

    pub fn with_dest_value(mut self, value: impl Into<String>) -> Self {
        self.dest_value = value.into();
        self
    }

    fn reversed(&self) -> Self {
        Self {
            source_field_id: self.dest_field_id,
            dest_field_id: self.source_field_id,
            source_value: self.dest_value.clone(),
            dest_value: self.source_value.clone(),
        }
    }
}

/// An edge from `info_area_id` to `target_info_area_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    pub info_area_id: String,
    pub target_info_area_id: String,
    pub link_id: i32,
    pub reverse_link_id: i32,
    pub relation: LinkRelation,
    /// Source side of a field link, -1 when unset.
    pub source_field_id: i32,
    /// Target side of a field link, -1 when unset.
    pub dest_field_id: i32,
    pub use_link_fields: bool,
    pub link_fields: Vec<LinkFieldInfo>,
    column_side: LinkColumnSide,
}

impl LinkInfo {
    pub fn new(
        info_area_id: impl Into<String>,
        target_info_area_id: impl Into<String>,
        link_id: i32,
        reverse_link_id: i32,
        relation: LinkRelation,
    ) -> Self {
        Self {
            info_area_id: info_area_id.into(),
            target_info_area_id: target_info_area_id.into(),
            link_id,
            reverse_link_id,
            relation,
            source_field_id: -1,
            dest_field_id: -1,
            use_link_fields: false,
            link_fields: Vec::new(),
            column_side: relation.column_side(),
        }
    }

    /// Join on `source.F<source_field_id> = target.F<dest_field_id>`.
    pub fn with_field_link(mut self, source_field_id: i32, dest_field_id: i32) -> Self {
        self.source_field_id = source_field_id;
        self.dest_field_id = dest_field_id;
        self
    }

    /// Join on the AND of all pairs.
    pub fn with_link_fields(mut self, link_fields: Vec<LinkFieldInfo>) -> Self {
        self.use_link_fields = true;
        self.link_fields = link_fields;
        self
    }

    pub fn column_side(&self) -> LinkColumnSide {
        self.column_side
    }

    pub fn is_generic(&self) -> bool {
        self.relation == LinkRelation::Generic
    }

    pub fn is_ident(&self) -> bool {
        self.relation == LinkRelation::Ident
    }

    pub fn is_field_link(&self) -> bool {
        !self.use_link_fields && self.source_field_id >= 0 && self.dest_field_id >= 0
    }

    /// Whether the source table holds the link column(s).
    pub fn has_column(&self) -> bool {
        self.column_side == LinkColumnSide::Source
    }

    /// Sort key: (target info area, link id).
    pub fn key(&self) -> (&str, i32) {
        (&self.target_info_area_id, self.link_id)
    }

    /// Name under which the link is indexed on its source table.
    pub fn name(&self) -> String {
        naming::link_column(&self.target_info_area_id, self.link_id)
    }

    /// The physical key column, named after the side that stores it.
    pub fn column_name(&self) -> Option<String> {
        match self.column_side {
            LinkColumnSide::Source if self.is_generic() => {
                Some(naming::generic_link_record_column(self.link_id))
            }
            LinkColumnSide::Source => Some(naming::link_column(
                &self.target_info_area_id,
                self.link_id,
            )),
            LinkColumnSide::Target if self.is_generic() => {
                Some(naming::generic_link_record_column(self.reverse_link_id))
            }
            LinkColumnSide::Target => Some(naming::link_column(
                &self.info_area_id,
                self.reverse_link_id,
            )),
            LinkColumnSide::None => None,
        }
    }

    /// The discriminator column of a generic link.
    pub fn info_area_column_name(&self) -> Option<String> {
        if !self.is_generic() {
            return None;
        }
        match self.column_side {
            LinkColumnSide::Source => Some(naming::generic_link_info_area_column(self.link_id)),
            LinkColumnSide::Target => Some(naming::generic_link_info_area_column(
                self.reverse_link_id,
            )),
            LinkColumnSide::None => None,
        }
    }

    /// Columns this link adds to its source table.
    pub fn physical_columns(&self) -> Vec<(String, &'static str)> {
        if !self.has_column() || self.use_link_fields || self.is_field_link() {
            return Vec::new();
        }
        let mut columns = Vec::with_capacity(2);
        if let Some(key) = self.column_name() {
            columns.push((key, "TEXT"));
        }
        if let Some(ia) = self.info_area_column_name() {
            columns.push((ia, "TEXT"));
        }
        columns
    }

    /// The same link traversed from its target.
    ///
    /// Ids, field pairs, literals and the column side are swapped; the
    /// original is left untouched.
    pub fn reversed(&self) -> LinkInfo {
        LinkInfo {
            info_area_id: self.target_info_area_id.clone(),
            target_info_area_id: self.info_area_id.clone(),
            link_id: self.reverse_link_id,
            reverse_link_id: self.link_id,
            relation: self.relation.reversed(),
            source_field_id: self.dest_field_id,
            dest_field_id: self.source_field_id,
            use_link_fields: self.use_link_fields,
            link_fields: self.link_fields.iter().map(LinkFieldInfo::reversed).collect(),
            column_side: self.column_side.flipped(),
        }
    }
}

/// A link from `source_info_area_id` to `target_info_area_id` realized
/// through rows of `via_info_area_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualLinkInfo {
    pub source_info_area_id: String,
    pub target_info_area_id: String,
    pub link_id: i32,
    pub via_info_area_id: String,
    /// Intermediate -> source hop.
    pub link_to_source: LinkInfo,
    /// Intermediate -> target hop.
    pub link_to_target: LinkInfo,
}

impl VirtualLinkInfo {
    pub fn new(
        source_info_area_id: impl Into<String>,
        target_info_area_id: impl Into<String>,
        link_id: i32,
        link_to_source: LinkInfo,
        link_to_target: LinkInfo,
    ) -> Self {
        Self {
            source_info_area_id: source_info_area_id.into(),
            target_info_area_id: target_info_area_id.into(),
            link_id,
            via_info_area_id: link_to_source.info_area_id.clone(),
            link_to_source,
            link_to_target,
        }
    }

    /// Both hops are single key columns on the intermediate table.
    pub fn is_simple(&self) -> bool {
        [&self.link_to_source, &self.link_to_target]
            .iter()
            .all(|hop| hop.has_column() && !hop.use_link_fields && !hop.is_generic())
    }
}
