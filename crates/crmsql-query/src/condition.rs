//! Predicates attached to query tree nodes.
//!
//! A condition renders against the alias and table of the node it belongs
//! to. Values are bound as anonymous `?` parameters in text order through the
//! [`StatementCreationContext`].

use crate::context::StatementCreationContext;
use crmsql_core::{SchemaErrorKind, Value};
use crmsql_schema::{FieldInfo, FieldType, TableInfo, naming};

/// Comparison operator of a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Like,
    NotLike,
}

impl CompareOp {
    /// Parse an operator as written in query definitions.
    pub fn parse(text: &str) -> Option<Self> {
        let op = match text.trim().to_ascii_uppercase().as_str() {
            "=" | "==" => CompareOp::Equal,
            "<>" | "!=" => CompareOp::NotEqual,
            "<" => CompareOp::Less,
            "<=" => CompareOp::LessOrEqual,
            ">" => CompareOp::Greater,
            ">=" => CompareOp::GreaterOrEqual,
            "LIKE" => CompareOp::Like,
            "NOT LIKE" => CompareOp::NotLike,
            _ => return None,
        };
        Some(op)
    }

    pub const fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Equal => "=",
            CompareOp::NotEqual => "<>",
            CompareOp::Less => "<",
            CompareOp::LessOrEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterOrEqual => ">=",
            CompareOp::Like => "LIKE",
            CompareOp::NotLike => "NOT LIKE",
        }
    }

    pub const fn is_negative(self) -> bool {
        matches!(self, CompareOp::NotEqual | CompareOp::NotLike)
    }

    /// The operator with its negation removed.
    pub const fn positive(self) -> Self {
        match self {
            CompareOp::NotEqual => CompareOp::Equal,
            CompareOp::NotLike => CompareOp::Like,
            other => other,
        }
    }

    const fn is_equality(self) -> bool {
        matches!(self, CompareOp::Equal | CompareOp::NotEqual)
    }

    const fn is_like(self) -> bool {
        matches!(self, CompareOp::Like | CompareOp::NotLike)
    }
}

/// Boolean connective of a [`TreeItemCondition::Relation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationOp {
    And,
    Or,
}

impl RelationOp {
    const fn as_sql(self) -> &'static str {
        match self {
            RelationOp::And => " AND ",
            RelationOp::Or => " OR ",
        }
    }
}

/// Right-hand side of a raw column comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    /// Bound as a parameter.
    Value(Value),
    /// Inlined SQL expression, typically a qualified column of an outer node.
    Column(String),
    /// `IS NULL`, or `IS NOT NULL` for negative operators.
    Null,
}

/// Comparison of one field against one or more values.
///
/// Equality against a value containing `*` or `?` turns into `LIKE` /
/// `NOT LIKE` with `%` / `_` when the condition is built, so rendering the
/// same condition again yields the same text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValueCondition {
    field_id: i32,
    op: CompareOp,
    terms: Vec<(CompareOp, String)>,
}

impl FieldValueCondition {
    pub fn new<I, S>(field_id: i32, op: CompareOp, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut terms: Vec<(CompareOp, String)> = values
            .into_iter()
            .map(|value| translate_wildcards(op, value.into()))
            .collect();
        if terms.is_empty() {
            terms.push((op, String::new()));
        }
        Self {
            field_id,
            op,
            terms,
        }
    }

    pub fn field_id(&self) -> i32 {
        self.field_id
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    /// Comparison values after wildcard translation.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(_, value)| value.as_str())
    }

    fn to_sql(&self, alias: &str, table: &TableInfo, ctx: &mut StatementCreationContext<'_>) -> String {
        let Some(field) = table.field(self.field_id) else {
            ctx.set_error(
                SchemaErrorKind::FieldNotFound,
                format!(
                    "field {} is not defined for {}",
                    self.field_id,
                    table.info_area_id()
                ),
            );
            return "1 = 0".to_string();
        };

        let rendered: Vec<String> = self
            .terms
            .iter()
            .map(|(op, value)| field_term(alias, table, field, *op, value, ctx))
            .collect();
        if rendered.len() == 1 {
            return rendered.into_iter().next().unwrap_or_default();
        }
        // several values: any may match, or none may for negative operators
        let joiner = if self.op.is_negative() { " AND " } else { " OR " };
        format!("({})", rendered.join(joiner))
    }
}

fn translate_wildcards(op: CompareOp, value: String) -> (CompareOp, String) {
    if !op.is_equality() || !value.contains(['*', '?']) {
        return (op, value);
    }
    let pattern = value.replace('*', "%").replace('?', "_");
    let op = if op.is_negative() {
        CompareOp::NotLike
    } else {
        CompareOp::Like
    };
    (op, pattern)
}

/// True when `value` is one of the spellings of "unset" for this field.
fn is_empty_value(field: &FieldInfo, value: &str) -> bool {
    value.is_empty()
        || (value == "0" && (field.field_type.is_numeric() || field.field_type.is_catalog()))
        || (value == "false" && field.field_type.is_boolean())
}

/// Whether an unset value of this type may be stored as integer zero.
fn has_zero_representation(field_type: FieldType) -> bool {
    field_type.is_numeric()
        || field_type.is_catalog()
        || field_type.is_boolean()
        || field_type == FieldType::Structured
}

fn typed_value(field: &FieldInfo, op: CompareOp, value: &str) -> Value {
    if op.is_like() {
        return Value::from(value);
    }
    let ty = field.field_type;
    if ty.is_boolean() {
        return match value {
            "true" | "1" => Value::BigInt(1),
            "false" | "0" => Value::BigInt(0),
            other => Value::from(other),
        };
    }
    if ty == FieldType::Float {
        return value
            .trim()
            .parse::<f64>()
            .map_or_else(|_| Value::from(value), Value::Double);
    }
    if has_zero_representation(ty) {
        return value
            .trim()
            .parse::<i64>()
            .map_or_else(|_| Value::from(value), Value::BigInt);
    }
    Value::from(value)
}

fn field_term(
    alias: &str,
    table: &TableInfo,
    field: &FieldInfo,
    op: CompareOp,
    value: &str,
    ctx: &mut StatementCreationContext<'_>,
) -> String {
    let column = format!("{}.{}", alias, field.column_name());

    if field.is_participants() {
        return participants_term(alias, table, field, op, value, ctx);
    }

    if op.is_equality() && is_empty_value(field, value) {
        let empty = if has_zero_representation(field.field_type) {
            let zero = ctx.bind(Value::BigInt(0));
            let blank = ctx.bind(Value::from(""));
            format!("({column} = {zero} OR {column} = {blank} OR {column} IS NULL)")
        } else {
            let blank = ctx.bind(Value::from(""));
            format!("({column} = {blank} OR {column} IS NULL)")
        };
        return if op.is_negative() {
            format!("NOT {}", empty)
        } else {
            empty
        };
    }

    if field.is_catalog() && value.trim().parse::<i64>().is_err() {
        let catalog_table = if field.is_fixed_catalog() {
            naming::fixed_catalog_table(field.cat)
        } else {
            naming::variable_catalog_table(field.cat)
        };
        let placeholder = ctx.bind(Value::from(value));
        return format!(
            "{} {}IN (SELECT code FROM {} WHERE text {} {})",
            column,
            if op.is_negative() { "NOT " } else { "" },
            catalog_table,
            op.positive().as_sql(),
            placeholder
        );
    }

    let placeholder = ctx.bind(typed_value(field, op, value));
    format!("{} {} {}", column, op.as_sql(), placeholder)
}

/// Participants are rows of an auxiliary table keyed by record id.
fn participants_term(
    alias: &str,
    table: &TableInfo,
    field: &FieldInfo,
    op: CompareOp,
    value: &str,
    ctx: &mut StatementCreationContext<'_>,
) -> String {
    let part_table = naming::participants_table(table.root_info_area_id(), field.field_id);
    let part_alias = format!("{}_F{}", alias, field.field_id);
    let correlation = format!(
        "{pa}.{rid} = {alias}.{rid}",
        pa = part_alias,
        rid = naming::RECORD_ID_COLUMN
    );

    if op.is_equality() && value.is_empty() {
        // "is empty" means no participant row at all
        return format!(
            "{}EXISTS (SELECT * FROM {} AS {} WHERE {})",
            if op.is_negative() { "" } else { "NOT " },
            part_table,
            part_alias,
            correlation
        );
    }

    let placeholder = ctx.bind(Value::from(value));
    format!(
        "{}EXISTS (SELECT * FROM {} AS {} WHERE {} AND {}.value {} {})",
        if op.is_negative() { "NOT " } else { "" },
        part_table,
        part_alias,
        correlation,
        part_alias,
        op.positive().as_sql(),
        placeholder
    )
}

/// Comparison of a physical column, named directly.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNameCondition {
    pub column: String,
    pub op: CompareOp,
    pub value: ConditionValue,
}

impl FieldNameCondition {
    fn to_sql(&self, alias: &str, ctx: &mut StatementCreationContext<'_>) -> String {
        let column = if self.column.contains('.') {
            self.column.clone()
        } else {
            format!("{}.{}", alias, self.column)
        };
        match &self.value {
            ConditionValue::Null if self.op.is_negative() => format!("{} IS NOT NULL", column),
            ConditionValue::Null => format!("{} IS NULL", column),
            ConditionValue::Column(other) => format!("{} {} {}", column, self.op.as_sql(), other),
            ConditionValue::Value(value) => {
                let placeholder = ctx.bind(value.clone());
                format!("{} {} {}", column, self.op.as_sql(), placeholder)
            }
        }
    }
}

/// `column [NOT] IN (SELECT FKEY.<foreign column> FROM <foreign table> AS FKEY ...)`.
///
/// The nested condition renders against the foreign table under the
/// `FKEY` alias.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyCondition {
    pub column: String,
    pub negated: bool,
    pub foreign_info_area_id: String,
    pub foreign_column: String,
    pub condition: Option<Box<TreeItemCondition>>,
}

impl ForeignKeyCondition {
    fn to_sql(&self, alias: &str, ctx: &mut StatementCreationContext<'_>) -> String {
        let Some(foreign) = ctx.model().table(&self.foreign_info_area_id) else {
            ctx.set_error(
                SchemaErrorKind::TableNotFound,
                format!("unknown info area {}", self.foreign_info_area_id),
            );
            return "1 = 0".to_string();
        };
        let mut sql = format!(
            "{}.{} {}IN (SELECT {}.{} FROM {} AS {}",
            alias,
            self.column,
            if self.negated { "NOT " } else { "" },
            naming::FOREIGN_KEY_ALIAS,
            self.foreign_column,
            foreign.database_table_name(),
            naming::FOREIGN_KEY_ALIAS
        );
        if let Some(condition) = &self.condition {
            let nested = condition.to_sql(naming::FOREIGN_KEY_ALIAS, foreign, ctx);
            sql.push_str(" WHERE ");
            sql.push_str(&nested);
        }
        sql.push(')');
        sql
    }
}

/// A predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeItemCondition {
    FieldValue(FieldValueCondition),
    FieldName(FieldNameCondition),
    ForeignKey(ForeignKeyCondition),
    Relation {
        op: RelationOp,
        conditions: Vec<TreeItemCondition>,
    },
}

impl TreeItemCondition {
    /// `F<field_id> <op> value`, with the empty, wildcard, catalog and
    /// participants rewrites.
    pub fn field_value(field_id: i32, op: CompareOp, value: impl Into<String>) -> Self {
        TreeItemCondition::FieldValue(FieldValueCondition::new(field_id, op, [value.into()]))
    }

    /// Like [`field_value`](Self::field_value) against several values: any
    /// of them for positive operators, none of them for negative ones.
    pub fn field_values<I, S>(field_id: i32, op: CompareOp, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TreeItemCondition::FieldValue(FieldValueCondition::new(field_id, op, values))
    }

    pub fn field_name(column: impl Into<String>, op: CompareOp, value: ConditionValue) -> Self {
        TreeItemCondition::FieldName(FieldNameCondition {
            column: column.into(),
            op,
            value,
        })
    }

    pub fn foreign_key(
        column: impl Into<String>,
        foreign_info_area_id: impl Into<String>,
        foreign_column: impl Into<String>,
        condition: Option<TreeItemCondition>,
    ) -> Self {
        TreeItemCondition::ForeignKey(ForeignKeyCondition {
            column: column.into(),
            negated: false,
            foreign_info_area_id: foreign_info_area_id.into(),
            foreign_column: foreign_column.into(),
            condition: condition.map(Box::new),
        })
    }

    pub fn not_foreign_key(
        column: impl Into<String>,
        foreign_info_area_id: impl Into<String>,
        foreign_column: impl Into<String>,
        condition: Option<TreeItemCondition>,
    ) -> Self {
        match Self::foreign_key(column, foreign_info_area_id, foreign_column, condition) {
            TreeItemCondition::ForeignKey(mut fk) => {
                fk.negated = true;
                TreeItemCondition::ForeignKey(fk)
            }
            other => other,
        }
    }

    pub fn and(conditions: Vec<TreeItemCondition>) -> Self {
        TreeItemCondition::Relation {
            op: RelationOp::And,
            conditions,
        }
    }

    pub fn or(conditions: Vec<TreeItemCondition>) -> Self {
        TreeItemCondition::Relation {
            op: RelationOp::Or,
            conditions,
        }
    }

    /// Combine with `other` under AND, flattening an existing AND group.
    pub fn and_also(self, other: TreeItemCondition) -> Self {
        match self {
            TreeItemCondition::Relation {
                op: RelationOp::And,
                mut conditions,
            } => {
                conditions.push(other);
                TreeItemCondition::and(conditions)
            }
            first => TreeItemCondition::and(vec![first, other]),
        }
    }

    /// Render against the node aliased `alias` whose table is `table`.
    pub fn to_sql(
        &self,
        alias: &str,
        table: &TableInfo,
        ctx: &mut StatementCreationContext<'_>,
    ) -> String {
        match self {
            TreeItemCondition::FieldValue(c) => c.to_sql(alias, table, ctx),
            TreeItemCondition::FieldName(c) => c.to_sql(alias, ctx),
            TreeItemCondition::ForeignKey(c) => c.to_sql(alias, ctx),
            TreeItemCondition::Relation { op, conditions } => match conditions.as_slice() {
                [] => match op {
                    RelationOp::And => "1 = 1".to_string(),
                    RelationOp::Or => "1 = 0".to_string(),
                },
                [single] => single.to_sql(alias, table, ctx),
                many => {
                    let parts: Vec<String> = many
                        .iter()
                        .map(|c| format!("({})", c.to_sql(alias, table, ctx)))
                        .collect();
                    parts.join(op.as_sql())
                }
            },
        }
    }
}
