//! Per-info-area schema: fields, links, link resolution and DDL.

use crate::cached::Cached;
use crate::field::FieldInfo;
use crate::introspect::PhysicalTable;
use crate::link::{LinkInfo, VirtualLinkInfo};
use crate::naming;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq)]
struct NameIndex {
    fields_by_xml_name: BTreeMap<String, usize>,
    links_by_name: BTreeMap<String, usize>,
}

/// One logical entity type (info area) and its physical table.
///
/// Built once while metadata loads; afterwards only [`sort`](TableInfo::sort)
/// mutates it. Name lookups are served from an index that `sort` rebuilds and
/// every `add_*` call invalidates; a stale index falls back to a linear scan.
#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    info_area_id: String,
    root_info_area_id: String,
    name: String,
    has_lookup: bool,
    fields: Vec<FieldInfo>,
    links: Vec<LinkInfo>,
    virtual_info_areas: Vec<String>,
    virtual_links: Vec<VirtualLinkInfo>,
    sorted: bool,
    index: Cached<NameIndex>,
}

impl TableInfo {
    pub fn new(
        info_area_id: impl Into<String>,
        root_info_area_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let info_area_id = info_area_id.into();
        let mut root_info_area_id = root_info_area_id.into();
        if root_info_area_id.is_empty() {
            root_info_area_id.clone_from(&info_area_id);
        }
        Self {
            info_area_id,
            root_info_area_id,
            name: name.into(),
            has_lookup: false,
            fields: Vec::new(),
            links: Vec::new(),
            virtual_info_areas: Vec::new(),
            virtual_links: Vec::new(),
            sorted: true,
            index: Cached::Stale,
        }
    }

    pub fn with_lookup(mut self, has_lookup: bool) -> Self {
        self.has_lookup = has_lookup;
        self
    }

    pub fn info_area_id(&self) -> &str {
        &self.info_area_id
    }

    pub fn root_info_area_id(&self) -> &str {
        &self.root_info_area_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether lookup-only rows may exist in this table.
    pub fn has_lookup(&self) -> bool {
        self.has_lookup
    }

    /// Virtual sub-areas are stored in their root's table.
    pub fn is_root(&self) -> bool {
        self.info_area_id == self.root_info_area_id
    }

    pub fn database_table_name(&self) -> String {
        naming::table_name(&self.root_info_area_id)
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn links(&self) -> &[LinkInfo] {
        &self.links
    }

    pub fn virtual_info_areas(&self) -> &[String] {
        &self.virtual_info_areas
    }

    pub fn virtual_links(&self) -> &[VirtualLinkInfo] {
        &self.virtual_links
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Register a field. A field with the same id is replaced.
    pub fn add_field(&mut self, field: FieldInfo) {
        if let Some(existing) = self.fields.iter_mut().find(|f| f.field_id == field.field_id) {
            *existing = field;
        } else {
            self.fields.push(field);
        }
        self.mark_unsorted();
    }

    /// Register a link. A link with the same (target, link id) is replaced.
    pub fn add_link(&mut self, link: LinkInfo) {
        if let Some(existing) = self.links.iter_mut().find(|l| l.key() == link.key()) {
            *existing = link;
        } else {
            self.links.push(link);
        }
        self.mark_unsorted();
    }

    pub fn add_virtual_info_area(&mut self, info_area_id: impl Into<String>) {
        let info_area_id = info_area_id.into();
        if !self.virtual_info_areas.contains(&info_area_id) {
            self.virtual_info_areas.push(info_area_id);
        }
    }

    pub fn add_virtual_link(&mut self, link: VirtualLinkInfo) {
        self.virtual_links.push(link);
    }

    fn mark_unsorted(&mut self) {
        self.sorted = false;
        self.index.invalidate();
    }

    /// Sort fields by id and links by (target, link id), then rebuild the
    /// name index.
    pub fn sort(&mut self) {
        if !self.sorted {
            self.fields.sort_by_key(|f| f.field_id);
            self.links.sort_by(|a, b| a.key().cmp(&b.key()));
            self.sorted = true;
        }
        let fields = &self.fields;
        let links = &self.links;
        self.index.get_or_insert_with(|| NameIndex {
            fields_by_xml_name: fields
                .iter()
                .enumerate()
                .filter(|(_, f)| !f.xml_name.is_empty())
                .map(|(i, f)| (f.xml_name.clone(), i))
                .collect(),
            links_by_name: links.iter().enumerate().map(|(i, l)| (l.name(), i)).collect(),
        });
    }

    pub fn field(&self, field_id: i32) -> Option<&FieldInfo> {
        if self.sorted {
            self.fields
                .binary_search_by_key(&field_id, |f| f.field_id)
                .ok()
                .map(|i| &self.fields[i])
        } else {
            self.fields.iter().find(|f| f.field_id == field_id)
        }
    }

    pub fn field_by_xml_name(&self, xml_name: &str) -> Option<&FieldInfo> {
        match self.index.get() {
            Some(index) => index
                .fields_by_xml_name
                .get(xml_name)
                .map(|&i| &self.fields[i]),
            None => self.fields.iter().find(|f| f.xml_name == xml_name),
        }
    }

    /// Look a link up by its `LINK_<target>_<slot>` name.
    pub fn link_by_name(&self, name: &str) -> Option<&LinkInfo> {
        match self.index.get() {
            Some(index) => index.links_by_name.get(name).map(|&i| &self.links[i]),
            None => self.links.iter().find(|l| l.name() == name),
        }
    }

    /// Best matching link to `target_info_area_id`.
    ///
    /// Precedence: exact (target, link id) match, then for default requests
    /// (`link_id <= 0`) the first link with id `<= 0` (non-generic preferred,
    /// else the last link seen to the target), then for positive requests
    /// the first link whose reverse id equals `link_id`.
    pub fn get_link(&self, target_info_area_id: &str, link_id: i32) -> Option<&LinkInfo> {
        let mut reverse_match: Option<&LinkInfo> = None;
        let mut default_match: Option<&LinkInfo> = None;
        let mut last_seen: Option<&LinkInfo> = None;

        for link in self
            .links
            .iter()
            .filter(|l| l.target_info_area_id == target_info_area_id)
        {
            if link.link_id == link_id {
                return Some(link);
            }
            if link_id > 0 {
                if reverse_match.is_none() && link.reverse_link_id == link_id {
                    reverse_match = Some(link);
                }
                continue;
            }
            if link.link_id <= 0 {
                match default_match {
                    None => default_match = Some(link),
                    Some(current) if current.is_generic() && !link.is_generic() => {
                        default_match = Some(link);
                    }
                    Some(_) => {}
                }
            }
            last_seen = Some(link);
        }

        default_match.or(last_seen).or(reverse_match)
    }

    pub fn get_default_link(&self, target_info_area_id: &str) -> Option<&LinkInfo> {
        self.get_link(target_info_area_id, -1)
    }

    pub fn get_virtual_link(
        &self,
        target_info_area_id: &str,
        link_id: i32,
    ) -> Option<&VirtualLinkInfo> {
        let mut candidates = self
            .virtual_links
            .iter()
            .filter(|v| v.target_info_area_id == target_info_area_id);
        if link_id <= 0 {
            candidates.next()
        } else {
            candidates.find(|v| v.link_id == link_id)
        }
    }

    pub fn participants_fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().filter(|f| f.is_participants())
    }

    /// All physical columns of the entity table, in creation order.
    pub fn column_definitions(&self) -> Vec<(String, String)> {
        let mut seen = BTreeSet::new();
        let mut columns = Vec::new();
        let mut push = |name: String, ty: &str| {
            if seen.insert(name.clone()) {
                columns.push((name, ty.to_string()));
            }
        };
        for (name, ty) in naming::RESERVED_COLUMNS {
            push(name.to_string(), ty);
        }
        for field in &self.fields {
            push(field.column_name(), field.field_type.sql_type());
        }
        for link in &self.links {
            for (name, ty) in link.physical_columns() {
                push(name, ty);
            }
        }
        columns
    }

    pub fn create_table_statement(&self) -> String {
        let columns = self
            .column_definitions()
            .into_iter()
            .map(|(name, ty)| format!("{} {}", name, ty))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({})", self.database_table_name(), columns)
    }

    pub fn participants_table_statement(&self, field: &FieldInfo) -> String {
        format!(
            "CREATE TABLE {} (recid TEXT, nr INTEGER, value TEXT COLLATE NOCASE, PRIMARY KEY (recid, nr))",
            naming::participants_table(&self.root_info_area_id, field.field_id)
        )
    }

    /// Statements creating the entity table and every participants table.
    pub fn create_statements(&self) -> Vec<String> {
        let mut statements = vec![self.create_table_statement()];
        statements.extend(
            self.participants_fields()
                .map(|f| self.participants_table_statement(f)),
        );
        statements
    }

    /// Statements bringing `physical` up to date: one `ALTER TABLE ... ADD
    /// COLUMN` per missing column, plus `CREATE TABLE` for participants
    /// tables absent from `existing_tables`.
    pub fn alter_table_statements(
        &self,
        physical: &PhysicalTable,
        existing_tables: &BTreeSet<String>,
    ) -> Vec<String> {
        let table = self.database_table_name();
        let mut statements: Vec<String> = self
            .column_definitions()
            .into_iter()
            .filter(|(name, _)| !physical.has_column(name))
            .map(|(name, ty)| {
                // SQLite refuses ADD COLUMN with PRIMARY KEY
                let ty = ty.trim_end_matches(" PRIMARY KEY");
                format!("ALTER TABLE {} ADD COLUMN {} {}", table, name, ty)
            })
            .collect();
        for field in self.participants_fields() {
            let part = naming::participants_table(&self.root_info_area_id, field.field_id);
            if !existing_tables.contains(&part) {
                statements.push(self.participants_table_statement(field));
            }
        }
        statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use crate::link::{LinkFieldInfo, LinkRelation};

    fn link(target: &str, id: i32, reverse: i32, relation: LinkRelation) -> LinkInfo {
        LinkInfo::new("XX", target, id, reverse, relation)
    }

    #[test]
    fn get_link_precedence() {
        let mut table = TableInfo::new("XX", "XX", "Test");
        table.add_link(link("A", 5, 2, LinkRelation::ManyToOne));
        table.add_link(link("A", -1, 0, LinkRelation::Generic));
        table.sort();

        assert_eq!(table.get_link("A", 5).map(|l| l.link_id), Some(5));
        assert_eq!(table.get_link("A", -1).map(|l| l.link_id), Some(-1));
        assert_eq!(table.get_link("A", 2).map(|l| l.link_id), Some(5));
        assert_eq!(table.get_default_link("A").map(|l| l.link_id), Some(-1));
        assert!(table.get_link("B", 0).is_none());
        assert!(table.get_link("A", 9).is_none());

        // repeated calls agree
        for _ in 0..3 {
            assert_eq!(table.get_link("A", 2).map(|l| l.link_id), Some(5));
        }
    }

    #[test]
    fn default_link_prefers_non_generic() {
        let mut table = TableInfo::new("XX", "XX", "Test");
        table.add_link(link("A", -2, 0, LinkRelation::Generic));
        table.add_link(link("A", 0, 0, LinkRelation::ManyToOne));
        table.sort();
        let found = table.get_link("A", -1).map(|l| (l.link_id, l.is_generic()));
        assert_eq!(found, Some((0, false)));
    }

    #[test]
    fn default_request_falls_back_to_last_seen() {
        let mut table = TableInfo::new("XX", "XX", "Test");
        table.add_link(link("A", 3, 0, LinkRelation::ManyToOne));
        table.add_link(link("A", 7, 0, LinkRelation::ManyToOne));
        table.sort();
        assert_eq!(table.get_default_link("A").map(|l| l.link_id), Some(7));
    }

    #[test]
    fn name_index_follows_sort() {
        let mut table = TableInfo::new("KP", "KP", "Person");
        table.add_field(FieldInfo::new("KP", 9, FieldType::Char).with_xml_name("LastName"));
        table.add_field(FieldInfo::new("KP", 2, FieldType::Char).with_xml_name("FirstName"));
        table.add_link(link("FI", 0, 0, LinkRelation::ManyToOne));
        assert!(!table.is_sorted());
        // unsorted lookups still work
        assert_eq!(table.field(9).map(|f| f.xml_name.as_str()), Some("LastName"));
        assert_eq!(table.link_by_name("LINK_FI_0").map(|l| l.link_id), Some(0));

        table.sort();
        assert!(table.is_sorted());
        assert_eq!(table.fields()[0].field_id, 2);
        assert_eq!(table.field_by_xml_name("LastName").map(|f| f.field_id), Some(9));
        assert_eq!(table.link_by_name("LINK_FI_0").map(|l| l.link_id), Some(0));
        assert!(table.field_by_xml_name("Nope").is_none());

        table.add_field(FieldInfo::new("KP", 1, FieldType::Date).with_xml_name("Born"));
        assert!(!table.is_sorted());
        assert_eq!(table.field_by_xml_name("Born").map(|f| f.field_id), Some(1));
    }

    #[test]
    fn create_statement_covers_fields_links_and_participants() {
        let mut table = TableInfo::new("MA", "MA", "Activity");
        table.add_field(FieldInfo::new("MA", 0, FieldType::Date));
        table.add_field(FieldInfo::new("MA", 1, FieldType::Char));
        table.add_field(
            FieldInfo::new("MA", 5, FieldType::Char).with_attributes(FieldInfo::ATTR_PARTICIPANTS),
        );
        table.add_link(LinkInfo::new("MA", "FI", 0, 0, LinkRelation::ManyToOne));
        table.add_link(LinkInfo::new("MA", "KP", 1, 0, LinkRelation::Generic));
        table.add_link(
            LinkInfo::new("MA", "PR", 0, 0, LinkRelation::ManyToOne)
                .with_link_fields(vec![LinkFieldInfo::fields(1, 2)]),
        );
        table.sort();

        let statements = table.create_statements();
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0],
            "CREATE TABLE CRM_MA (recid TEXT PRIMARY KEY, title TEXT, sync TEXT, upd TEXT, \
             lookup INTEGER, F0 TEXT, F1 TEXT COLLATE NOCASE, F5 TEXT COLLATE NOCASE, \
             LINK_FI_0 TEXT, LINK_RECID_1 TEXT, LINK_IA_1 TEXT)"
        );
        assert_eq!(
            statements[1],
            "CREATE TABLE CRM_MA_PART_F5 (recid TEXT, nr INTEGER, value TEXT COLLATE NOCASE, PRIMARY KEY (recid, nr))"
        );
    }

    #[test]
    fn alter_adds_only_missing_columns() {
        let mut table = TableInfo::new("FI", "FI", "Company");
        table.add_field(FieldInfo::new("FI", 0, FieldType::Char));
        table.add_field(FieldInfo::new("FI", 3, FieldType::Long));
        table.add_field(
            FieldInfo::new("FI", 4, FieldType::Char).with_attributes(FieldInfo::ATTR_PARTICIPANTS),
        );
        table.sort();

        let physical = PhysicalTable::new(
            "CRM_FI",
            ["recid", "title", "sync", "upd", "lookup", "F0"].map(String::from).to_vec(),
        );
        let existing: BTreeSet<String> = ["CRM_FI".to_string()].into_iter().collect();
        let statements = table.alter_table_statements(&physical, &existing);
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE CRM_FI ADD COLUMN F3 INTEGER".to_string(),
                "ALTER TABLE CRM_FI ADD COLUMN F4 TEXT COLLATE NOCASE".to_string(),
                "CREATE TABLE CRM_FI_PART_F4 (recid TEXT, nr INTEGER, value TEXT COLLATE NOCASE, PRIMARY KEY (recid, nr))".to_string(),
            ]
        );
    }

    #[test]
    fn virtual_sub_area_uses_root_table() {
        let table = TableInfo::new("FI1", "FI", "Branch");
        assert!(!table.is_root());
        assert_eq!(table.database_table_name(), "CRM_FI");
        let root = TableInfo::new("FI", "", "Company");
        assert!(root.is_root());
    }
}
