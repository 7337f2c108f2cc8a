//! Link resolution and join predicates between two tree nodes.

use crate::condition::{CompareOp, ConditionValue, TreeItemCondition};
use crate::context::StatementCreationContext;
use crmsql_core::{SchemaErrorKind, sql_literal};
use crmsql_schema::{
    DataModel, LinkColumnSide, LinkFieldInfo, LinkInfo, TableInfo, VirtualLinkInfo, naming,
};

/// How a child node attaches to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkJoin {
    /// One predicate between the parent and child aliases.
    Direct(String),
    /// Through an intermediate table that needs its own alias.
    Via {
        table: String,
        alias: String,
        /// Intermediate to parent.
        to_parent: String,
        /// Intermediate to child.
        to_child: String,
    },
}

enum ResolvedLink {
    Direct(LinkInfo),
    Virtual(VirtualLinkInfo),
    Missing,
}

fn resolve(parent: &TableInfo, child: &TableInfo, link_id: i32) -> ResolvedLink {
    let mut targets = vec![child.info_area_id()];
    if !child.is_root() {
        targets.push(child.root_info_area_id());
    }

    for target in &targets {
        if link_id > 0 {
            if let Some(link) = parent.link_by_name(&naming::link_column(target, link_id)) {
                return ResolvedLink::Direct(link.clone());
            }
        }
        if let Some(link) = parent.get_link(target, link_id) {
            return ResolvedLink::Direct(link.clone());
        }
    }

    for target in &targets {
        if let Some(virtual_link) = parent.get_virtual_link(target, link_id) {
            return ResolvedLink::Virtual(virtual_link.clone());
        }
    }

    // declared only on the child side
    let mut sources = vec![parent.info_area_id()];
    if !parent.is_root() {
        sources.push(parent.root_info_area_id());
    }
    for source in sources {
        if let Some(link) = child.get_link(source, link_id) {
            return ResolvedLink::Direct(link.reversed());
        }
    }

    ResolvedLink::Missing
}

/// Resolve the link from `parent` to `child` and build its join shape.
///
/// An unresolvable link is recorded on the context and compilation goes on
/// with a placeholder predicate. Its child column `LINK_<parent>_<link_id>`
/// is built from the requested forward link id since no reverse link id is
/// known; it only shows up in diagnostic SQL that is never executed.
pub fn link_join(
    ctx: &mut StatementCreationContext<'_>,
    parent: &TableInfo,
    parent_alias: &str,
    child: &TableInfo,
    child_alias: &str,
    link_id: i32,
) -> LinkJoin {
    match resolve(parent, child, link_id) {
        ResolvedLink::Direct(link) => {
            LinkJoin::Direct(link_predicate(ctx.model(), &link, parent_alias, child_alias))
        }
        ResolvedLink::Virtual(virtual_link) if virtual_link.is_simple() => LinkJoin::Direct(
            simple_virtual_predicate(ctx, &virtual_link, parent_alias, child, child_alias),
        ),
        ResolvedLink::Virtual(virtual_link) => {
            let model = ctx.model();
            let Some(via) = model.table(&virtual_link.via_info_area_id) else {
                ctx.set_error(
                    SchemaErrorKind::TableNotFound,
                    format!(
                        "virtual link {} -> {} goes through unknown info area {}",
                        parent.info_area_id(),
                        child.info_area_id(),
                        virtual_link.via_info_area_id
                    ),
                );
                return LinkJoin::Direct("1 = 0".to_string());
            };
            let alias = format!("{}_{}", child_alias, virtual_link.via_info_area_id);
            LinkJoin::Via {
                table: via.database_table_name(),
                to_parent: link_predicate(model, &virtual_link.link_to_source, &alias, parent_alias),
                to_child: link_predicate(model, &virtual_link.link_to_target, &alias, child_alias),
                alias,
            }
        }
        ResolvedLink::Missing => {
            ctx.set_error(
                SchemaErrorKind::LinkNotFound,
                format!(
                    "no link from {} to {} with id {}",
                    parent.info_area_id(),
                    child.info_area_id(),
                    link_id
                ),
            );
            LinkJoin::Direct(format!(
                "{}.{} = {}.{}",
                child_alias,
                naming::link_column(parent.info_area_id(), link_id),
                parent_alias,
                naming::RECORD_ID_COLUMN
            ))
        }
    }
}

/// `child.recid IN (SELECT FKEY.<to target> FROM <via> AS FKEY WHERE FKEY.<to source> = parent.recid)`.
fn simple_virtual_predicate(
    ctx: &mut StatementCreationContext<'_>,
    virtual_link: &VirtualLinkInfo,
    parent_alias: &str,
    child: &TableInfo,
    child_alias: &str,
) -> String {
    let to_source = virtual_link.link_to_source.column_name().unwrap_or_default();
    let to_target = virtual_link.link_to_target.column_name().unwrap_or_default();
    let correlation = TreeItemCondition::field_name(
        to_source,
        CompareOp::Equal,
        ConditionValue::Column(format!("{}.{}", parent_alias, naming::RECORD_ID_COLUMN)),
    );
    TreeItemCondition::foreign_key(
        naming::RECORD_ID_COLUMN,
        virtual_link.via_info_area_id.clone(),
        to_target,
        Some(correlation),
    )
    .to_sql(child_alias, child, ctx)
}

fn root_of<'m>(model: &'m DataModel, info_area_id: &'m str) -> &'m str {
    model
        .table(info_area_id)
        .map_or(info_area_id, |t| t.root_info_area_id())
}

/// Join predicate for `link`, whose source side is aliased `source_alias`
/// and whose target side is aliased `target_alias`.
pub fn link_predicate(
    model: &DataModel,
    link: &LinkInfo,
    source_alias: &str,
    target_alias: &str,
) -> String {
    let recid = naming::RECORD_ID_COLUMN;

    if link.use_link_fields {
        return link_fields_predicate(&link.link_fields, source_alias, target_alias);
    }
    if link.is_field_link() {
        return format!(
            "{}.{} = {}.{}",
            source_alias,
            naming::field_column(link.source_field_id),
            target_alias,
            naming::field_column(link.dest_field_id)
        );
    }
    if link.is_ident() {
        return format!("{source_alias}.{recid} = {target_alias}.{recid}");
    }

    match (link.column_side(), link.column_name()) {
        (LinkColumnSide::Source, Some(column)) => {
            let key = format!("{}.{} = {}.{}", source_alias, column, target_alias, recid);
            match link.info_area_column_name() {
                Some(discriminator) => format!(
                    "{} AND {}",
                    key,
                    literal_comparison(
                        &format!("{}.{}", source_alias, discriminator),
                        root_of(model, &link.target_info_area_id)
                    )
                ),
                None => key,
            }
        }
        (LinkColumnSide::Target, Some(column)) => {
            let key = format!("{}.{} = {}.{}", target_alias, column, source_alias, recid);
            match link.info_area_column_name() {
                Some(discriminator) => format!(
                    "{} AND {}",
                    key,
                    literal_comparison(
                        &format!("{}.{}", target_alias, discriminator),
                        root_of(model, &link.info_area_id)
                    )
                ),
                None => key,
            }
        }
        _ => format!(
            "{}.{} = {}.{}",
            target_alias,
            naming::link_column(&link.info_area_id, link.reverse_link_id),
            source_alias,
            recid
        ),
    }
}

/// `column = 'value'`; the two interchangeable root markers match either.
fn literal_comparison(column: &str, value: &str) -> String {
    if naming::is_interchangeable_root(value) {
        format!(
            "({column} = {} OR {column} = {})",
            sql_literal("CP"),
            sql_literal("KP")
        )
    } else {
        format!("{} = {}", column, sql_literal(value))
    }
}

enum Side {
    Column(String),
    Literal(String),
    Empty,
}

fn side(alias: &str, field_id: i32, literal: &str) -> Side {
    if !literal.is_empty() {
        Side::Literal(literal.to_string())
    } else if field_id >= 0 {
        Side::Column(format!("{}.{}", alias, naming::field_column(field_id)))
    } else {
        Side::Empty
    }
}

fn link_fields_predicate(pairs: &[LinkFieldInfo], source_alias: &str, target_alias: &str) -> String {
    let parts: Vec<String> = pairs
        .iter()
        .filter_map(|pair| {
            let source = side(source_alias, pair.source_field_id, &pair.source_value);
            let target = side(target_alias, pair.dest_field_id, &pair.dest_value);
            match (source, target) {
                (Side::Column(s), Side::Column(t)) => Some(format!("{} = {}", s, t)),
                (Side::Column(c), Side::Literal(v)) | (Side::Literal(v), Side::Column(c)) => {
                    Some(literal_comparison(&c, &v))
                }
                (Side::Column(c), Side::Empty) | (Side::Empty, Side::Column(c)) => {
                    Some(format!("{} IS NULL", c))
                }
                _ => None,
            }
        })
        .collect();
    if parts.is_empty() {
        "1 = 1".to_string()
    } else {
        parts.join(" AND ")
    }
}
