//! Query trees and their compilation into one `SELECT`.
//!
//! A tree is rooted at one info area. Every child is attached to its parent
//! through a link and either joins into the outer statement (contributing
//! output columns) or becomes an `EXISTS` / `NOT EXISTS` sub-select in its
//! parent's condition.
//!
//! Compilation runs in four passes over the tree, in the order the pieces
//! appear in the statement text so parameters bind in placeholder order:
//!
//! 1. FROM: joins for every non-existence node, with each node's composed
//!    condition appended to its `ON` predicate
//! 2. output columns: per node fields, link columns, then `recid` and
//!    `title` unless already selected, recording their positions
//! 3. WHERE: the root's composed condition
//! 4. ORDER BY / LIMIT

use crate::compiled::{CompiledQuery, NodeOutput};
use crate::condition::TreeItemCondition;
use crate::context::StatementCreationContext;
use crate::link_join::{LinkJoin, link_join};
use crate::template::RecordTemplate;
use crmsql_core::SchemaErrorKind;
use crmsql_schema::{DataModel, TableInfo, naming};

/// How a child node relates to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Relation {
    /// Inner join.
    #[default]
    Join,
    /// Outer join (`PLUS`).
    LeftJoin,
    /// Inner join; an existence test when the node selects nothing.
    With,
    WithOptional,
    /// No matching child may exist.
    Without,
    WithoutOptional,
    /// A matching child must exist.
    Having,
    HavingOptional,
}

impl Relation {
    /// Parse a relation name; case and embedded blanks are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let key: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        let relation = match key.as_str() {
            "" | "JOIN" => Relation::Join,
            "PLUS" | "LEFTJOIN" => Relation::LeftJoin,
            "WITH" => Relation::With,
            "WITHOPTIONAL" => Relation::WithOptional,
            "WITHOUT" => Relation::Without,
            "WITHOUTOPTIONAL" => Relation::WithoutOptional,
            "HAVING" => Relation::Having,
            "HAVINGOPTIONAL" => Relation::HavingOptional,
            _ => return None,
        };
        Some(relation)
    }

    pub const fn is_optional(self) -> bool {
        matches!(
            self,
            Relation::WithOptional | Relation::WithoutOptional | Relation::HavingOptional
        )
    }

    /// Renders as `NOT EXISTS`.
    pub const fn is_negated(self) -> bool {
        matches!(self, Relation::Without | Relation::WithoutOptional)
    }

    const fn always_existence(self) -> bool {
        !matches!(self, Relation::Join | Relation::LeftJoin | Relation::With)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortField {
    pub field_id: i32,
    pub descending: bool,
}

impl SortField {
    pub fn asc(field_id: i32) -> Self {
        Self {
            field_id,
            descending: false,
        }
    }

    pub fn desc(field_id: i32) -> Self {
        Self {
            field_id,
            descending: true,
        }
    }
}

/// One node of a query tree.
#[derive(Debug, Clone)]
pub struct QueryTreeItem {
    template: RecordTemplate,
    link_id: i32,
    relation: Relation,
    alias: String,
    condition: Option<TreeItemCondition>,
    children: Vec<QueryTreeItem>,
    ignore_lookup_rows: bool,
    sort_fields: Vec<SortField>,
    max_results: Option<u64>,
    record_id_index: Option<usize>,
    info_area_id_index: Option<usize>,
    parent_record_id_index: Option<usize>,
    parent_field_count: Option<usize>,
}

impl QueryTreeItem {
    /// A root node, aliased `_<info area>`.
    pub fn root(template: RecordTemplate) -> Self {
        let alias = format!("_{}", template.info_area_id());
        Self::with_relation(template, -1, Relation::Join, alias)
    }

    /// A detached child; its alias is assigned when it is added to a parent.
    pub fn child(template: RecordTemplate, link_id: i32, relation: Relation) -> Self {
        Self::with_relation(template, link_id, relation, String::new())
    }

    fn with_relation(template: RecordTemplate, link_id: i32, relation: Relation, alias: String) -> Self {
        Self {
            template,
            link_id,
            relation,
            alias,
            condition: None,
            children: Vec::new(),
            ignore_lookup_rows: false,
            sort_fields: Vec::new(),
            max_results: None,
            record_id_index: None,
            info_area_id_index: None,
            parent_record_id_index: None,
            parent_field_count: None,
        }
    }

    pub fn with_condition(mut self, condition: TreeItemCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn set_condition(&mut self, condition: Option<TreeItemCondition>) {
        self.condition = condition;
    }

    /// Exclude rows that only exist to resolve lookups.
    pub fn with_ignore_lookup_rows(mut self, ignore: bool) -> Self {
        self.ignore_lookup_rows = ignore;
        self
    }

    pub fn with_sort(mut self, sort: SortField) -> Self {
        self.sort_fields.push(sort);
        self
    }

    /// `LIMIT` of the statement; only honored on the root.
    pub fn with_max_results(mut self, max_results: u64) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_child(mut self, child: QueryTreeItem) -> Self {
        self.add_child(child);
        self
    }

    /// Attach `child`, aliasing it and its whole subtree after this node.
    pub fn add_child(&mut self, mut child: QueryTreeItem) -> &mut QueryTreeItem {
        let index = self.children.len();
        child.assign_alias(format!("{}{}{}", self.alias, child.info_area_id(), index));
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    fn assign_alias(&mut self, alias: String) {
        self.alias = alias;
        for (index, child) in self.children.iter_mut().enumerate() {
            let alias = format!("{}{}{}", self.alias, child.info_area_id(), index);
            child.assign_alias(alias);
        }
    }

    pub fn template(&self) -> &RecordTemplate {
        &self.template
    }

    pub fn info_area_id(&self) -> &str {
        self.template.info_area_id()
    }

    fn table(&self) -> &TableInfo {
        self.template.table()
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn link_id(&self) -> i32 {
        self.link_id
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn condition(&self) -> Option<&TreeItemCondition> {
        self.condition.as_ref()
    }

    pub fn children(&self) -> &[QueryTreeItem] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [QueryTreeItem] {
        &mut self.children
    }

    /// Result column of this node's record id, set by compilation.
    pub fn record_id_index(&self) -> Option<usize> {
        self.record_id_index
    }

    pub fn info_area_id_index(&self) -> Option<usize> {
        self.info_area_id_index
    }

    /// For existence nodes: the parent's record id column.
    pub fn parent_record_id_index(&self) -> Option<usize> {
        self.parent_record_id_index
    }

    /// For existence nodes: the number of fields the parent selects.
    pub fn parent_field_count(&self) -> Option<usize> {
        self.parent_field_count
    }

    /// Whether this node renders as `[NOT] EXISTS` instead of a join.
    pub fn is_sub_query(&self) -> bool {
        self.relation.always_existence()
            || (self.relation == Relation::With
                && self.template.field_ids().is_empty()
                && self.template.link_field_names().is_empty())
    }

    /// Compile the tree rooted at this node.
    ///
    /// Never fails: schema problems are carried on the result and make
    /// [`CompiledQuery::execute`] refuse to run.
    pub fn compile(&mut self, model: &DataModel) -> CompiledQuery {
        let mut ctx = StatementCreationContext::new(model);

        let mut from = format!("{} AS {}", self.table().database_table_name(), self.alias);
        self.add_from_parts(&mut ctx, &mut from);

        let mut columns = Vec::new();
        let mut outputs = Vec::new();
        self.add_output_columns(&mut ctx, &mut columns, &mut outputs);

        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), from);
        if let Some(condition) = self.composed_condition(&mut ctx) {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }

        let mut order = Vec::new();
        self.add_order_by(&mut ctx, &mut order);
        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }
        if let Some(limit) = self.max_results {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let (params, error) = ctx.into_parts();
        tracing::debug!(
            info_area_id = %self.info_area_id(),
            params = params.len(),
            valid = error.is_none(),
            "compiled query tree"
        );
        tracing::trace!(sql = %sql, "compiled query text");
        CompiledQuery::new(sql, params, error, outputs)
    }

    fn add_from_parts(&self, ctx: &mut StatementCreationContext<'_>, from: &mut String) {
        for child in &self.children {
            if child.is_sub_query() {
                continue;
            }
            let keyword = if child.relation == Relation::LeftJoin {
                "LEFT JOIN"
            } else {
                "JOIN"
            };
            let child_table = child.table().database_table_name();
            match link_join(ctx, self.table(), &self.alias, child.table(), &child.alias, child.link_id) {
                LinkJoin::Direct(predicate) => {
                    from.push_str(&format!(
                        " {} {} AS {} ON {}",
                        keyword, child_table, child.alias, predicate
                    ));
                }
                LinkJoin::Via {
                    table,
                    alias,
                    to_parent,
                    to_child,
                } => {
                    from.push_str(&format!(
                        " {keyword} {table} AS {alias} ON {to_parent} {keyword} {child_table} AS {} ON {to_child}",
                        child.alias
                    ));
                }
            }
            if let Some(condition) = child.composed_condition(ctx) {
                from.push_str(&format!(" AND ({})", condition));
            }
            child.add_from_parts(ctx, from);
        }
    }

    fn add_output_columns(
        &mut self,
        ctx: &mut StatementCreationContext<'_>,
        columns: &mut Vec<String>,
        outputs: &mut Vec<NodeOutput>,
    ) {
        let first_field_index = columns.len();
        for &field_id in self.template.field_ids() {
            if self.template.is_empty_field(field_id) {
                columns.push("null".to_string());
            } else if self.table().field(field_id).is_none() {
                ctx.set_error(
                    SchemaErrorKind::FieldNotFound,
                    format!("field {} is not defined for {}", field_id, self.info_area_id()),
                );
                columns.push("null".to_string());
            } else {
                columns.push(format!("{}.{}", self.alias, naming::field_column(field_id)));
            }
        }

        let first_link_field_index = columns.len();
        for name in self.template.link_field_names() {
            columns.push(format!("{}.{}", self.alias, name));
        }

        let mut reserved_index = |name: &str| {
            match self.template.link_field_names().iter().position(|n| n == name) {
                Some(pos) => first_link_field_index + pos,
                None => {
                    columns.push(format!("{}.{}", self.alias, name));
                    columns.len() - 1
                }
            }
        };
        let record_id_index = reserved_index(naming::RECORD_ID_COLUMN);
        let info_area_id_index = reserved_index(naming::INFO_AREA_ID_COLUMN);
        self.record_id_index = Some(record_id_index);
        self.info_area_id_index = Some(info_area_id_index);

        outputs.push(NodeOutput {
            alias: self.alias.clone(),
            info_area_id: self.info_area_id().to_string(),
            field_ids: self.template.field_ids().to_vec(),
            first_field_index,
            link_field_names: self.template.link_field_names().to_vec(),
            first_link_field_index,
            record_id_index,
            info_area_id_index,
        });

        let field_count = self.template.field_ids().len();
        for child in &mut self.children {
            if child.is_sub_query() {
                child.record_id_index = None;
                child.info_area_id_index = None;
                child.parent_record_id_index = Some(record_id_index);
                child.parent_field_count = Some(field_count);
            } else {
                child.parent_record_id_index = None;
                child.parent_field_count = None;
                child.add_output_columns(ctx, columns, outputs);
            }
        }
    }

    /// Own condition, lookup exclusion and existence clauses, AND-joined.
    fn composed_condition(&self, ctx: &mut StatementCreationContext<'_>) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(condition) = &self.condition {
            parts.push(condition.to_sql(&self.alias, self.table(), ctx));
        }
        if self.ignore_lookup_rows && ctx.model().has_lookup(self.info_area_id()) {
            parts.push(format!(
                "({alias}.{col} = 0 OR {alias}.{col} IS NULL)",
                alias = self.alias,
                col = naming::LOOKUP_COLUMN
            ));
        }
        if let Some(existence) = self.existence_condition(ctx) {
            parts.push(existence);
        }

        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(
                parts
                    .iter()
                    .map(|part| format!("({})", part))
                    .collect::<Vec<_>>()
                    .join(" AND "),
            ),
        }
    }

    /// Required existence children AND-joined, then optional ones as an
    /// OR group.
    fn existence_condition(&self, ctx: &mut StatementCreationContext<'_>) -> Option<String> {
        let mut required = Vec::new();
        let mut optional = Vec::new();
        for child in self.children.iter().filter(|c| c.is_sub_query()) {
            let clause = child.existence_clause(self, ctx);
            if child.relation.is_optional() {
                optional.push(clause);
            } else {
                required.push(clause);
            }
        }

        match (required.is_empty(), optional.is_empty()) {
            (true, true) => None,
            (false, true) => Some(required.join(" AND ")),
            (true, false) => Some(format!("({})", optional.join(" OR "))),
            (false, false) => Some(format!(
                "{} AND ({})",
                required.join(" AND "),
                optional.join(" OR ")
            )),
        }
    }

    /// `[NOT] EXISTS (SELECT * FROM <table> AS <alias> ... WHERE <link> [AND (<condition>)])`.
    fn existence_clause(&self, parent: &QueryTreeItem, ctx: &mut StatementCreationContext<'_>) -> String {
        let negation = if self.relation.is_negated() { "NOT " } else { "" };
        match link_join(ctx, parent.table(), &parent.alias, self.table(), &self.alias, self.link_id) {
            LinkJoin::Direct(predicate) => {
                format!("{}EXISTS ({})", negation, self.exists_select(ctx, &predicate))
            }
            LinkJoin::Via {
                table,
                alias,
                to_parent,
                to_child,
            } => {
                let inner = self.exists_select(ctx, &to_child);
                format!(
                    "{}EXISTS (SELECT * FROM {} AS {} WHERE {} AND (EXISTS ({})))",
                    negation, table, alias, to_parent, inner
                )
            }
        }
    }

    fn exists_select(&self, ctx: &mut StatementCreationContext<'_>, predicate: &str) -> String {
        let mut from = format!("{} AS {}", self.table().database_table_name(), self.alias);
        self.add_from_parts(ctx, &mut from);
        let mut sql = format!("SELECT * FROM {} WHERE {}", from, predicate);
        if let Some(condition) = self.composed_condition(ctx) {
            sql.push_str(&format!(" AND ({})", condition));
        }
        sql
    }

    fn add_order_by(&self, ctx: &mut StatementCreationContext<'_>, order: &mut Vec<String>) {
        for sort in &self.sort_fields {
            if self.table().field(sort.field_id).is_none() {
                ctx.set_error(
                    SchemaErrorKind::FieldNotFound,
                    format!(
                        "sort field {} is not defined for {}",
                        sort.field_id,
                        self.info_area_id()
                    ),
                );
                continue;
            }
            order.push(format!(
                "{}.{} {}",
                self.alias,
                naming::field_column(sort.field_id),
                if sort.descending { "DESC" } else { "ASC" }
            ));
        }
        for child in self.children.iter().filter(|c| !c.is_sub_query()) {
            child.add_order_by(ctx, order);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::CompareOp;
    use crmsql_core::Value;
    use crmsql_schema::{FieldInfo, FieldType, LinkInfo, LinkRelation};

    fn model() -> DataModel {
        let mut fi = TableInfo::new("FI", "FI", "Company").with_lookup(true);
        let mut kp = TableInfo::new("KP", "KP", "Person");
        let mut ma = TableInfo::new("MA", "MA", "Activity");
        for id in 0..4 {
            fi.add_field(FieldInfo::new("FI", id, FieldType::Char));
            kp.add_field(FieldInfo::new("KP", id, FieldType::Char));
            ma.add_field(FieldInfo::new("MA", id, FieldType::Char));
        }
        kp.add_link(LinkInfo::new("KP", "FI", 0, 0, LinkRelation::ManyToOne));
        fi.add_link(LinkInfo::new("FI", "KP", 0, 0, LinkRelation::OneToMany));
        ma.add_link(LinkInfo::new("MA", "FI", 0, 0, LinkRelation::ManyToOne));
        ma.add_link(LinkInfo::new("MA", "KP", 0, 0, LinkRelation::Generic));

        let mut model = DataModel::new();
        model.add_table(fi);
        model.add_table(kp);
        model.add_table(ma);
        model.sort();
        model
    }

    fn node(model: &DataModel, ia: &str, fields: Vec<i32>, relation: Relation) -> QueryTreeItem {
        QueryTreeItem::child(
            RecordTemplate::from_model(model, ia, fields).unwrap(),
            -1,
            relation,
        )
    }

    fn root(model: &DataModel, ia: &str, fields: Vec<i32>) -> QueryTreeItem {
        QueryTreeItem::root(RecordTemplate::from_model(model, ia, fields).unwrap())
    }

    #[test]
    fn parse_relations() {
        assert_eq!(Relation::parse("PLUS"), Some(Relation::LeftJoin));
        assert_eq!(Relation::parse("having optional"), Some(Relation::HavingOptional));
        assert_eq!(Relation::parse("WITHOUT"), Some(Relation::Without));
        assert_eq!(Relation::parse(""), Some(Relation::Join));
        assert_eq!(Relation::parse("MAYBE"), None);
    }

    #[test]
    fn aliases_follow_parent_and_sibling_position() {
        let model = model();
        let grandchild = node(&model, "MA", vec![0], Relation::Join);
        let child = node(&model, "KP", vec![0], Relation::Join).with_child(grandchild);
        let mut tree = root(&model, "FI", vec![0]);
        tree.add_child(node(&model, "MA", vec![], Relation::Having));
        tree.add_child(child);

        assert_eq!(tree.alias(), "_FI");
        assert_eq!(tree.children()[0].alias(), "_FIMA0");
        assert_eq!(tree.children()[1].alias(), "_FIKP1");
        assert_eq!(tree.children()[1].children()[0].alias(), "_FIKP1MA0");
    }

    #[test]
    fn output_indices_are_stable() {
        let model = model();
        let build = || {
            root(&model, "FI", vec![0, 1, 2]).with_child(node(&model, "KP", vec![1, 3], Relation::Join))
        };

        let mut tree = build();
        let compiled = tree.compile(&model);
        assert!(compiled.is_valid(), "{:?}", compiled.error());
        assert_eq!(
            compiled.sql(),
            "SELECT _FI.F0, _FI.F1, _FI.F2, _FI.recid, _FI.title, _FIKP0.F1, _FIKP0.F3, _FIKP0.recid, _FIKP0.title \
             FROM CRM_FI AS _FI JOIN CRM_KP AS _FIKP0 ON _FIKP0.LINK_FI_0 = _FI.recid"
        );
        assert_eq!(tree.record_id_index(), Some(3));
        assert_eq!(tree.info_area_id_index(), Some(4));
        assert_eq!(tree.children()[0].record_id_index(), Some(7));
        assert_eq!(tree.children()[0].info_area_id_index(), Some(8));

        let outputs = compiled.outputs();
        assert_eq!(outputs[0].first_field_index, 0);
        assert_eq!(outputs[1].first_field_index, 5);
        assert_eq!(outputs[1].field_index(3), Some(6));

        let mut again = build();
        let recompiled = again.compile(&model);
        assert_eq!(recompiled.sql(), compiled.sql());
        assert_eq!(recompiled.outputs(), compiled.outputs());
        assert_eq!(again.children()[0].record_id_index(), Some(7));
    }

    #[test]
    fn selected_reserved_columns_are_not_repeated() {
        let model = model();
        let template = RecordTemplate::from_model(&model, "KP", vec![0])
            .unwrap()
            .with_link_fields(["LINK_FI_0", "recid"]);
        let mut tree = QueryTreeItem::root(template);
        let compiled = tree.compile(&model);
        assert_eq!(
            compiled.sql(),
            "SELECT _KP.F0, _KP.LINK_FI_0, _KP.recid, _KP.title FROM CRM_KP AS _KP"
        );
        assert_eq!(tree.record_id_index(), Some(2));
        assert_eq!(tree.info_area_id_index(), Some(3));
    }

    #[test]
    fn existence_polarity() {
        let model = model();
        let mut tree = root(&model, "FI", vec![0])
            .with_child(node(&model, "KP", vec![], Relation::Without))
            .with_child(node(&model, "MA", vec![], Relation::Having));
        let compiled = tree.compile(&model);
        assert_eq!(
            compiled.sql(),
            "SELECT _FI.F0, _FI.recid, _FI.title FROM CRM_FI AS _FI WHERE \
             NOT EXISTS (SELECT * FROM CRM_KP AS _FIKP0 WHERE _FIKP0.LINK_FI_0 = _FI.recid) AND \
             EXISTS (SELECT * FROM CRM_MA AS _FIMA1 WHERE _FIMA1.LINK_FI_0 = _FI.recid)"
        );
        assert_eq!(tree.children()[0].parent_record_id_index(), Some(1));
        assert_eq!(tree.children()[0].parent_field_count(), Some(1));
        assert_eq!(tree.children()[0].record_id_index(), None);
    }

    #[test]
    fn with_without_fields_is_promoted() {
        let model = model();
        let mut promoted = root(&model, "FI", vec![0]).with_child(node(&model, "KP", vec![], Relation::With));
        assert!(promoted.children()[0].is_sub_query());
        let sql = promoted.compile(&model).sql().to_string();
        assert!(sql.ends_with("WHERE EXISTS (SELECT * FROM CRM_KP AS _FIKP0 WHERE _FIKP0.LINK_FI_0 = _FI.recid)"));

        let mut joined = root(&model, "FI", vec![0]).with_child(node(&model, "KP", vec![2], Relation::With));
        assert!(!joined.children()[0].is_sub_query());
        assert!(joined.compile(&model).sql().contains(" JOIN CRM_KP AS _FIKP0 ON "));
    }

    #[test]
    fn optional_group_is_or_joined() {
        let model = model();
        let both = root(&model, "FI", vec![0])
            .with_child(node(&model, "KP", vec![], Relation::Having))
            .with_child(node(&model, "KP", vec![], Relation::HavingOptional))
            .with_child(node(&model, "MA", vec![], Relation::WithoutOptional));
        let sql = both.clone().compile(&model).sql().to_string();
        assert!(sql.ends_with(
            "WHERE EXISTS (SELECT * FROM CRM_KP AS _FIKP0 WHERE _FIKP0.LINK_FI_0 = _FI.recid) AND \
             (EXISTS (SELECT * FROM CRM_KP AS _FIKP1 WHERE _FIKP1.LINK_FI_0 = _FI.recid) OR \
             NOT EXISTS (SELECT * FROM CRM_MA AS _FIMA2 WHERE _FIMA2.LINK_FI_0 = _FI.recid))"
        ), "{sql}");

        let mut only_optional = root(&model, "FI", vec![0])
            .with_child(node(&model, "KP", vec![], Relation::WithOptional))
            .with_child(node(&model, "MA", vec![], Relation::HavingOptional));
        let sql = only_optional.compile(&model).sql().to_string();
        assert!(sql.ends_with(
            "WHERE (EXISTS (SELECT * FROM CRM_KP AS _FIKP0 WHERE _FIKP0.LINK_FI_0 = _FI.recid) OR \
             EXISTS (SELECT * FROM CRM_MA AS _FIMA1 WHERE _FIMA1.LINK_FI_0 = _FI.recid))"
        ), "{sql}");
    }

    #[test]
    fn conditions_and_parameters_follow_text_order() {
        let model = model();
        let kp = node(&model, "KP", vec![0], Relation::LeftJoin)
            .with_condition(TreeItemCondition::field_value(1, CompareOp::Equal, "Ann"));
        let ma = node(&model, "MA", vec![], Relation::Having)
            .with_condition(TreeItemCondition::field_value(2, CompareOp::Equal, "Call"));
        let mut tree = root(&model, "FI", vec![0])
            .with_condition(TreeItemCondition::field_value(3, CompareOp::Equal, "Vienna"))
            .with_ignore_lookup_rows(true)
            .with_child(kp)
            .with_child(ma)
            .with_sort(SortField::desc(0))
            .with_max_results(10);
        let compiled = tree.compile(&model);
        assert_eq!(
            compiled.sql(),
            "SELECT _FI.F0, _FI.recid, _FI.title, _FIKP0.F0, _FIKP0.recid, _FIKP0.title \
             FROM CRM_FI AS _FI LEFT JOIN CRM_KP AS _FIKP0 ON _FIKP0.LINK_FI_0 = _FI.recid AND (_FIKP0.F1 = ?) \
             WHERE (_FI.F3 = ?) AND ((_FI.lookup = 0 OR _FI.lookup IS NULL)) AND \
             (EXISTS (SELECT * FROM CRM_MA AS _FIMA1 WHERE _FIMA1.LINK_FI_0 = _FI.recid AND (_FIMA1.F2 = ?))) \
             ORDER BY _FI.F0 DESC LIMIT 10"
        );
        assert_eq!(
            compiled.params(),
            &[Value::from("Ann"), Value::from("Vienna"), Value::from("Call")]
        );
    }

    #[test]
    fn lookup_exclusion_needs_lookup_rows() {
        let model = model();
        let mut tree = root(&model, "KP", vec![0]).with_ignore_lookup_rows(true);
        let sql = tree.compile(&model).sql().to_string();
        assert!(!sql.contains("lookup"), "{sql}");
    }

    #[test]
    fn generic_link_from_parent() {
        let model = model();
        let mut tree = root(&model, "MA", vec![0]).with_child(node(&model, "KP", vec![0], Relation::Join));
        let sql = tree.compile(&model).sql().to_string();
        assert!(sql.ends_with(
            "JOIN CRM_KP AS _MAKP0 ON _MA.LINK_RECID_0 = _MAKP0.recid AND (_MA.LINK_IA_0 = 'CP' OR _MA.LINK_IA_0 = 'KP')"
        ), "{sql}");
    }

    #[test]
    fn nested_existence_carries_grandchild_joins() {
        let model = model();
        let kp = node(&model, "KP", vec![], Relation::Having)
            .with_child(node(&model, "MA", vec![0], Relation::Join))
            .with_child(node(&model, "MA", vec![], Relation::Without));
        let mut tree = root(&model, "FI", vec![0]).with_child(kp);
        let sql = tree.compile(&model).sql().to_string();
        assert!(sql.ends_with(
            "WHERE EXISTS (SELECT * FROM CRM_KP AS _FIKP0 \
             JOIN CRM_MA AS _FIKP0MA0 ON _FIKP0MA0.LINK_RECID_0 = _FIKP0.recid AND (_FIKP0MA0.LINK_IA_0 = 'CP' OR _FIKP0MA0.LINK_IA_0 = 'KP') \
             WHERE _FIKP0.LINK_FI_0 = _FI.recid AND \
             (NOT EXISTS (SELECT * FROM CRM_MA AS _FIKP0MA1 WHERE _FIKP0MA1.LINK_RECID_0 = _FIKP0.recid AND (_FIKP0MA1.LINK_IA_0 = 'CP' OR _FIKP0MA1.LINK_IA_0 = 'KP'))))"
        ), "{sql}");
    }

    #[test]
    fn unresolved_link_is_reported_not_raised() {
        let mut model = model();
        model.add_table(TableInfo::new("ZZ", "ZZ", "Orphan"));
        let mut tree = root(&model, "FI", vec![0]).with_child(node(&model, "ZZ", vec![], Relation::Join));
        let compiled = tree.compile(&model);
        assert!(!compiled.is_valid());
        assert_eq!(compiled.error().map(|e| e.kind), Some(SchemaErrorKind::LinkNotFound));
        assert!(compiled.sql().contains("JOIN CRM_ZZ AS _FIZZ0 ON _FIZZ0.LINK_FI_0 = _FI.recid"));
    }

    #[test]
    fn unknown_sort_field_is_reported() {
        let model = model();
        let mut tree = root(&model, "FI", vec![0]).with_sort(SortField::asc(42));
        let compiled = tree.compile(&model);
        assert!(!compiled.is_valid());
        assert!(!compiled.sql().contains("ORDER BY"));
    }
}
